use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};

// ---------------------------------------------------------------------------
// SensorSpec
// ---------------------------------------------------------------------------

/// Which collaborator backs one sensor channel.
///
/// Format:
/// - `sim:<base>`: simulated sensor oscillating around `base`
/// - `file:<path>` or `file:<path>:<divisor>`: numeric file, value / divisor
/// - `none`: channel absent (only valid for pressure)
#[derive(Debug, Clone, PartialEq)]
pub enum SensorSpec {
    Simulated { base: f64 },
    File { path: PathBuf, divisor: f64 },
    Absent,
}

impl FromStr for SensorSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "none" {
            return Ok(Self::Absent);
        }

        let (kind, rest) = s
            .split_once(':')
            .with_context(|| format!("sensor spec must be 'sim:<base>', 'file:<path>[:<divisor>]' or 'none', got: {s:?}"))?;

        match kind {
            "sim" => {
                let base = rest
                    .parse()
                    .with_context(|| format!("invalid simulated base value in {s:?}"))?;
                Ok(Self::Simulated { base })
            }
            "file" => {
                // A trailing `:<number>` is a divisor; anything else is part of the path.
                let (path, divisor) = match rest.rsplit_once(':') {
                    Some((path, d)) if d.parse::<f64>().is_ok() => (path, d.parse::<f64>()?),
                    _ => (rest, 1.0),
                };
                if path.is_empty() {
                    bail!("empty path in sensor spec {s:?}");
                }
                if divisor == 0.0 || !divisor.is_finite() {
                    bail!("divisor must be a non-zero number in sensor spec {s:?}");
                }
                Ok(Self::File {
                    path: PathBuf::from(path),
                    divisor,
                })
            }
            other => Err(anyhow::anyhow!("unknown sensor kind {other:?} in {s:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// OutputSpec
// ---------------------------------------------------------------------------

/// Which collaborator drives the `switch_state` output: `log` or `file:<path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    Log,
    File(PathBuf),
}

impl FromStr for OutputSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "log" => Ok(Self::Log),
            other => match other.strip_prefix("file:") {
                Some(path) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
                _ => Err(anyhow::anyhow!(
                    "switch output must be 'log' or 'file:<path>', got: {other:?}"
                )),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Durable settings record; `None` keeps settings in memory only.
    pub settings_path: Option<PathBuf>,
    /// Time between sensor sampling cycles.
    pub sensor_interval: Duration,
    /// Period of the station loop that polls the scheduler and settings.
    pub loop_tick: Duration,
    pub temperature_sensor: SensorSpec,
    pub humidity_sensor: SensorSpec,
    /// `SensorSpec::Absent` builds the variant without a barometer.
    pub pressure_sensor: SensorSpec,
    pub switch_output: OutputSpec,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let settings_path = match optional("SETTINGS_PATH", "settings.json").as_str() {
            "memory" => None,
            path => Some(PathBuf::from(path)),
        };

        let temperature_sensor: SensorSpec = optional("TEMPERATURE_SENSOR", "sim:21.5")
            .parse()
            .context("TEMPERATURE_SENSOR is invalid")?;
        let humidity_sensor: SensorSpec = optional("HUMIDITY_SENSOR", "sim:48.0")
            .parse()
            .context("HUMIDITY_SENSOR is invalid")?;
        if temperature_sensor == SensorSpec::Absent || humidity_sensor == SensorSpec::Absent {
            bail!("temperature and humidity sensors are required and cannot be 'none'");
        }

        Ok(Self {
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            settings_path,
            sensor_interval: Duration::from_millis(positive_ms(
                &optional("SENSOR_READ_INTERVAL_MS", "60000"),
                "SENSOR_READ_INTERVAL_MS",
            )?),
            loop_tick: Duration::from_millis(positive_ms(
                &optional("LOOP_TICK_MS", "10"),
                "LOOP_TICK_MS",
            )?),
            temperature_sensor,
            humidity_sensor,
            pressure_sensor: optional("PRESSURE_SENSOR", "sim:1013.2")
                .parse()
                .context("PRESSURE_SENSOR is invalid")?,
            switch_output: optional("SWITCH_OUTPUT", "log")
                .parse()
                .context("SWITCH_OUTPUT is invalid")?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn positive_ms(raw: &str, key: &str) -> Result<u64> {
    let ms: u64 = raw
        .parse()
        .with_context(|| format!("{key} must be a positive integer"))?;
    if ms == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(ms)
}
