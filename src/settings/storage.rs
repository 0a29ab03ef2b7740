//! Durable media backing the settings store.
//!
//! A medium holds exactly one opaque record. The store decides the encoding;
//! storage only moves bytes.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage medium unavailable")]
    Unavailable,
}

/// A single-record durable medium.
pub trait Storage: Send {
    /// Returns the stored record, or `None` if nothing has been written yet.
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replaces the stored record.
    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// Stores the record in one file.
///
/// Writes land in a uniquely named sibling first and are renamed over the
/// record, so an interrupted write leaves the previous record readable.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_err(&self, source: io::Error) -> StorageError {
        StorageError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl Storage for FileStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.write_err(e))?;
        }

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_owned();
        tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let tmp = self.path.with_file_name(tmp_name);

        let result = fs::File::create(&tmp)
            .and_then(|mut f| {
                f.write_all(bytes)?;
                f.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(self.write_err(e));
        }
        // The rename is only durable once the directory entry is on disk.
        sync_parent(&self.path).map_err(|e| self.write_err(e))?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "settings record written");
        Ok(())
    }
}

/// Flushes the directory holding `path`.
#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Volatile medium. Clones share the same record, so a test can keep a handle
/// while the store owns another one.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    record: Option<Vec<u8>>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A medium that already holds `bytes`.
    pub fn with_record(bytes: impl Into<Vec<u8>>) -> Self {
        let storage = Self::default();
        storage.lock().record = Some(bytes.into());
        storage
    }

    /// Makes every subsequent write fail with [`StorageError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn record(&self) -> Option<Vec<u8>> {
        self.lock().record.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock().record.clone())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StorageError::Unavailable);
        }
        inner.record = Some(bytes.to_vec());
        inner.writes += 1;
        Ok(())
    }
}
