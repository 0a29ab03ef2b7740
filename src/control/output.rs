use std::{fs, io, path::PathBuf};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to drive output {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The physical output bound to `switch_state` (an indicator LED or relay).
pub trait SwitchOutput: Send {
    fn apply(&mut self, on: bool) -> Result<(), OutputError>;
}

/// Output that only reports the requested level in the log.
#[derive(Debug, Default)]
pub struct LogOutput {
    level: Option<bool>,
}

impl LogOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level applied, if any.
    pub fn level(&self) -> Option<bool> {
        self.level
    }
}

impl SwitchOutput for LogOutput {
    fn apply(&mut self, on: bool) -> Result<(), OutputError> {
        self.level = Some(on);
        info!("Switch output is now {}", if on { "ON" } else { "OFF" });
        Ok(())
    }
}

/// Drives a sysfs-style value file (`/sys/class/gpio/gpioN/value`) by
/// writing `1` or `0`.
#[derive(Debug, Clone)]
pub struct FileOutput {
    path: PathBuf,
}

impl FileOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SwitchOutput for FileOutput {
    fn apply(&mut self, on: bool) -> Result<(), OutputError> {
        let level = if on { "1\n" } else { "0\n" };
        fs::write(&self.path, level).map_err(|source| OutputError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), on, "Switch output written");
        Ok(())
    }
}
