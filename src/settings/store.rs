use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use super::{
    keys::{SettingKey, SettingValue, ValueKind},
    storage::{Storage, StorageError},
};

/// Layout version of the persisted record.
const RECORD_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown setting key: {0:?}")]
    UnknownKey(String),

    #[error("setting {key} expects a {expected} value, got {actual}")]
    TypeMismatch {
        key: SettingKey,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// The in-memory value was updated but could not be made durable.
    #[error("setting {key} kept in memory only: {source}")]
    Persist {
        key: SettingKey,
        #[source]
        source: StorageError,
    },
}

/// Reasons a stored record is discarded in favour of defaults.
#[derive(Debug, Error)]
enum RecordError {
    #[error("record is not valid JSON for this layout: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported record version {0}")]
    Version(u32),
    #[error("record has no entry for {0}")]
    Missing(SettingKey),
    #[error("record entry {0} has the wrong value type")]
    Kind(SettingKey),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Record {
    version: u32,
    saved_at: DateTime<Utc>,
    entries: BTreeMap<SettingKey, SettingValue>,
}

/// Typed, write-through configuration store.
///
/// Every key always has a value. Mutations are persisted immediately; if the
/// medium fails the value is still kept in memory and the store reports
/// itself as non-durable until the next successful write.
pub struct SettingsStore {
    values: [SettingValue; SettingKey::COUNT],
    storage: Box<dyn Storage>,
    durable: bool,
}

impl SettingsStore {
    /// Loads the record from `storage`, falling back to defaults for every key
    /// when the record is missing, unreadable or corrupt.
    pub fn load(storage: impl Storage + 'static) -> Self {
        let values = match storage.read() {
            Ok(None) => {
                info!("No stored settings found; using defaults");
                defaults()
            }
            Ok(Some(bytes)) => match decode(&bytes) {
                Ok(values) => {
                    info!("Settings loaded from storage");
                    values
                }
                Err(e) => {
                    warn!(error = %e, "Stored settings are corrupt; using defaults");
                    defaults()
                }
            },
            Err(e) => {
                warn!(error = %e, "Could not read stored settings; using defaults");
                defaults()
            }
        };

        Self {
            values,
            storage: Box::new(storage),
            durable: true,
        }
    }

    pub fn get(&self, key: SettingKey) -> &SettingValue {
        &self.values[key as usize]
    }

    /// Looks up a key by its snake_case name.
    pub fn get_by_name(&self, name: &str) -> Result<&SettingValue, StoreError> {
        Ok(self.get(name.parse()?))
    }

    /// Text value of `key`; empty for flag keys.
    pub fn text(&self, key: SettingKey) -> &str {
        self.get(key).as_text().unwrap_or_default()
    }

    /// Flag value of `key`; `false` for text keys.
    pub fn flag(&self, key: SettingKey) -> bool {
        self.get(key).as_flag().unwrap_or_default()
    }

    /// Whether the last persist attempt succeeded.
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    pub fn values(&self) -> BTreeMap<SettingKey, SettingValue> {
        SettingKey::ALL
            .into_iter()
            .map(|k| (k, self.get(k).clone()))
            .collect()
    }

    /// Updates `key` and rewrites the durable record.
    ///
    /// A value of the wrong kind is rejected and leaves the store untouched.
    pub fn set(&mut self, key: SettingKey, value: SettingValue) -> Result<(), StoreError> {
        if value.kind() != key.kind() {
            return Err(StoreError::TypeMismatch {
                key,
                expected: key.kind(),
                actual: value.kind(),
            });
        }

        self.values[key as usize] = value;
        self.persist()
            .map_err(|source| StoreError::Persist { key, source })
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let record = Record {
            version: RECORD_VERSION,
            saved_at: Utc::now(),
            entries: self.values(),
        };

        let result = serde_json::to_vec_pretty(&record)
            .map_err(StorageError::from)
            .and_then(|bytes| self.storage.write(&bytes));

        match &result {
            Ok(()) => {
                if !self.durable {
                    info!("Settings storage recovered; store is durable again");
                }
                self.durable = true;
            }
            Err(e) => {
                error!(error = %e, "Failed to persist settings; continuing in memory only");
                self.durable = false;
            }
        }
        result
    }
}

fn defaults() -> [SettingValue; SettingKey::COUNT] {
    SettingKey::ALL.map(SettingKey::default_value)
}

fn decode(bytes: &[u8]) -> Result<[SettingValue; SettingKey::COUNT], RecordError> {
    let mut record: Record = serde_json::from_slice(bytes)?;
    if record.version != RECORD_VERSION {
        return Err(RecordError::Version(record.version));
    }

    let mut values = defaults();
    for key in SettingKey::ALL {
        let value = record.entries.remove(&key).ok_or(RecordError::Missing(key))?;
        if value.kind() != key.kind() {
            return Err(RecordError::Kind(key));
        }
        values[key as usize] = value;
    }
    Ok(values)
}
