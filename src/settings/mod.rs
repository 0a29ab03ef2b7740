//! Persistent node configuration: the typed key-value store, the media it is
//! written to, and the service that applies UI changes to it.

pub mod keys;
pub mod service;
pub mod storage;
pub mod store;

pub use keys::{SettingKey, SettingValue, ValueKind};
pub use service::{ChangeEvent, SettingsHandle, SettingsService, SettingsView, SubmitError};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use store::{SettingsStore, StoreError};
