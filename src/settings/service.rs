use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::{
    keys::{SettingKey, SettingValue, ValueKind},
    store::{SettingsStore, StoreError},
};
use crate::control::SwitchOutput;

/// Longest SSID accepted, in bytes.
pub const MAX_SSID_LEN: usize = 32;
/// WPA2 passphrase length bounds, in bytes. An empty passphrase means an open
/// network and is always accepted.
pub const PASS_LEN: std::ops::RangeInclusive<usize> = 8..=63;

/// A UI-originated request to change one setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: SettingKey,
    pub value: SettingValue,
}

/// Read-only picture of the store, published after every applied change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsView {
    pub values: BTreeMap<SettingKey, SettingValue>,
    pub durable: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("{key} expects a {expected} value")]
    WrongKind { key: SettingKey, expected: ValueKind },
    #[error("{key} must be at most {max} bytes")]
    TooLong { key: SettingKey, max: usize },
    #[error("{key} must be empty or between {min} and {max} bytes")]
    OutOfRange {
        key: SettingKey,
        min: usize,
        max: usize,
    },
    #[error("settings service is not running")]
    Closed,
}

/// Rejects input that must never reach the store.
pub fn validate(key: SettingKey, value: &SettingValue) -> Result<(), SubmitError> {
    if value.kind() != key.kind() {
        return Err(SubmitError::WrongKind {
            key,
            expected: key.kind(),
        });
    }

    match (key, value) {
        (SettingKey::WifiSsid, SettingValue::Text(s)) if s.len() > MAX_SSID_LEN => {
            Err(SubmitError::TooLong {
                key,
                max: MAX_SSID_LEN,
            })
        }
        (SettingKey::WifiPass, SettingValue::Text(s)) if !s.is_empty() && !PASS_LEN.contains(&s.len()) => {
            Err(SubmitError::OutOfRange {
                key,
                min: *PASS_LEN.start(),
                max: *PASS_LEN.end(),
            })
        }
        _ => Ok(()),
    }
}

/// Cloneable front door used by the UI surface and other readers.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    events: mpsc::UnboundedSender<ChangeEvent>,
    view: watch::Receiver<SettingsView>,
}

impl SettingsHandle {
    /// Validates `value` and queues it for the next `poll` of the service.
    pub fn submit(&self, key: SettingKey, value: SettingValue) -> Result<(), SubmitError> {
        validate(key, &value)?;
        self.events
            .send(ChangeEvent { key, value })
            .map_err(|_| SubmitError::Closed)
    }

    pub fn current(&self) -> SettingsView {
        self.view.borrow().clone()
    }

    /// Change notifications, e.g. for the network layer to pick up new
    /// Wi-Fi credentials.
    pub fn subscribe(&self) -> watch::Receiver<SettingsView> {
        self.view.clone()
    }
}

/// Sole writer of the settings store.
///
/// Polled from the station loop; applies queued UI changes, drives the switch
/// output and republishes the view.
pub struct SettingsService {
    store: SettingsStore,
    output: Box<dyn SwitchOutput>,
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    view: watch::Sender<SettingsView>,
}

impl SettingsService {
    pub fn new(store: SettingsStore, output: Box<dyn SwitchOutput>) -> (Self, SettingsHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(view_of(&store));

        let service = Self {
            store,
            output,
            events: rx,
            view: view_tx,
        };
        let handle = SettingsHandle {
            events: tx,
            view: view_rx,
        };
        (service, handle)
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// Drives the output to the stored `switch_state`. Called once at boot.
    pub fn start(&mut self) {
        let on = self.store.flag(SettingKey::SwitchState);
        info!("Switch output restored to {}", if on { "ON" } else { "OFF" });
        if let Err(e) = self.output.apply(on) {
            error!(error = %e, "Failed to restore switch output");
        }
    }

    /// Applies every change queued since the last call and returns how many
    /// altered the store. Never waits for events.
    ///
    /// Events for the same key within one call collapse to the last one, and
    /// a value equal to the stored one is ignored, so repeated events cannot
    /// toggle the output or rewrite storage twice.
    pub fn poll(&mut self) -> usize {
        let mut pending: Vec<ChangeEvent> = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            match pending.iter_mut().find(|e| e.key == event.key) {
                Some(slot) => slot.value = event.value,
                None => pending.push(event),
            }
        }
        if pending.is_empty() {
            return 0;
        }

        let mut applied = 0;
        for ChangeEvent { key, value } in pending {
            if self.store.get(key) == &value {
                debug!(key = %key, "Setting unchanged; ignoring event");
                continue;
            }
            if value.kind() != key.kind() {
                warn!(key = %key, "Ignoring event with wrong value type");
                continue;
            }

            if let (SettingKey::SwitchState, Some(on)) = (key, value.as_flag()) {
                if let Err(e) = self.output.apply(on) {
                    error!(error = %e, "Failed to drive switch output; storing state anyway");
                }
            }

            match self.store.set(key, value) {
                Ok(()) => info!(key = %key, "Setting updated"),
                Err(e @ StoreError::Persist { .. }) => warn!(error = %e, "Setting updated"),
                Err(e) => {
                    warn!(error = %e, "Setting rejected by store");
                    continue;
                }
            }
            applied += 1;

            if matches!(key, SettingKey::WifiSsid | SettingKey::WifiPass) {
                info!("Wi-Fi credentials changed; reconnection is up to the network layer");
            }
        }

        self.view.send_replace(view_of(&self.store));
        applied
    }
}

fn view_of(store: &SettingsStore) -> SettingsView {
    SettingsView {
        values: store.values(),
        durable: store.is_durable(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{control::OutputError, settings::storage::MemoryStorage};

    /// Records every level applied to it.
    #[derive(Clone, Default)]
    struct RecordingOutput {
        applied: Arc<Mutex<Vec<bool>>>,
        fail: bool,
    }

    impl RecordingOutput {
        fn applied(&self) -> Vec<bool> {
            self.applied.lock().unwrap().clone()
        }
    }

    impl SwitchOutput for RecordingOutput {
        fn apply(&mut self, on: bool) -> Result<(), OutputError> {
            self.applied.lock().unwrap().push(on);
            if self.fail {
                return Err(OutputError::Io {
                    path: "/sys/class/gpio/gpio2/value".into(),
                    source: std::io::Error::other("gpio busy"),
                });
            }
            Ok(())
        }
    }

    fn service() -> (SettingsService, SettingsHandle, MemoryStorage, RecordingOutput) {
        let storage = MemoryStorage::new();
        let output = RecordingOutput::default();
        let store = SettingsStore::load(storage.clone());
        let (service, handle) = SettingsService::new(store, Box::new(output.clone()));
        (service, handle, storage, output)
    }

    fn on() -> SettingValue {
        SettingValue::Flag(true)
    }

    #[test]
    fn poll_without_events_is_a_noop() {
        let (mut service, _handle, storage, output) = service();
        assert_eq!(service.poll(), 0);
        assert_eq!(storage.writes(), 0);
        assert!(output.applied().is_empty());
    }

    #[test]
    fn switch_change_drives_output_and_persists() {
        let (mut service, handle, storage, output) = service();
        handle.submit(SettingKey::SwitchState, on()).unwrap();

        assert_eq!(service.poll(), 1);
        assert_eq!(output.applied(), vec![true]);
        assert_eq!(storage.writes(), 1);
        assert!(service.store().flag(SettingKey::SwitchState));
    }

    #[test]
    fn duplicate_events_in_one_cycle_apply_once() {
        let (mut service, handle, storage, output) = service();
        handle.submit(SettingKey::SwitchState, on()).unwrap();
        handle.submit(SettingKey::SwitchState, on()).unwrap();

        assert_eq!(service.poll(), 1);
        assert_eq!(output.applied(), vec![true]);
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn repeated_event_in_later_cycle_is_ignored() {
        let (mut service, handle, storage, output) = service();
        handle.submit(SettingKey::SwitchState, on()).unwrap();
        service.poll();
        handle.submit(SettingKey::SwitchState, on()).unwrap();

        assert_eq!(service.poll(), 0);
        assert_eq!(output.applied(), vec![true]);
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn last_event_per_key_wins() {
        let (mut service, handle, storage, output) = service();
        handle.submit(SettingKey::SwitchState, on()).unwrap();
        handle
            .submit(SettingKey::SwitchState, SettingValue::Flag(false))
            .unwrap();

        // net change is none: the stored value is already false
        assert_eq!(service.poll(), 0);
        assert!(output.applied().is_empty());
        assert_eq!(storage.writes(), 0);
    }

    #[test]
    fn wifi_change_persists_without_touching_output() {
        let (mut service, handle, storage, output) = service();
        handle
            .submit(SettingKey::WifiSsid, SettingValue::Text("garden".into()))
            .unwrap();
        handle
            .submit(SettingKey::WifiPass, SettingValue::Text("correcthorse".into()))
            .unwrap();

        assert_eq!(service.poll(), 2);
        assert!(output.applied().is_empty());
        assert_eq!(storage.writes(), 2);
        assert_eq!(service.store().text(SettingKey::WifiSsid), "garden");
        assert_eq!(service.store().text(SettingKey::WifiPass), "correcthorse");
    }

    #[test]
    fn output_failure_still_stores_state() {
        let storage = MemoryStorage::new();
        let output = RecordingOutput {
            fail: true,
            ..Default::default()
        };
        let (mut service, handle) =
            SettingsService::new(SettingsStore::load(storage.clone()), Box::new(output.clone()));

        handle.submit(SettingKey::SwitchState, on()).unwrap();
        assert_eq!(service.poll(), 1);
        assert_eq!(output.applied(), vec![true]);
        assert!(service.store().flag(SettingKey::SwitchState));
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn persist_failure_is_visible_in_view() {
        let (mut service, handle, storage, _output) = service();
        storage.set_fail_writes(true);
        handle.submit(SettingKey::CloseAp, on()).unwrap();

        assert_eq!(service.poll(), 1);
        let view = handle.current();
        assert!(!view.durable);
        assert_eq!(view.values[&SettingKey::CloseAp], on());
    }

    #[test]
    fn view_follows_applied_changes() {
        let (mut service, handle, _storage, _output) = service();
        let mut rx = handle.subscribe();
        assert!(handle.current().durable);
        assert_eq!(handle.current().values[&SettingKey::SwitchState], SettingValue::Flag(false));

        handle.submit(SettingKey::SwitchState, on()).unwrap();
        service.poll();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().values[&SettingKey::SwitchState], on());
    }

    #[test]
    fn start_restores_stored_switch_state() {
        let storage = MemoryStorage::new();
        {
            let mut store = SettingsStore::load(storage.clone());
            store.set(SettingKey::SwitchState, on()).unwrap();
        }
        let output = RecordingOutput::default();
        let (mut service, _handle) =
            SettingsService::new(SettingsStore::load(storage), Box::new(output.clone()));

        service.start();
        assert_eq!(output.applied(), vec![true]);
    }

    #[test]
    fn submit_rejects_invalid_input() {
        let (_service, handle, _storage, _output) = service();

        assert_eq!(
            handle.submit(SettingKey::SwitchState, SettingValue::Text("on".into())),
            Err(SubmitError::WrongKind {
                key: SettingKey::SwitchState,
                expected: ValueKind::Flag
            })
        );
        assert_eq!(
            handle.submit(SettingKey::WifiSsid, SettingValue::Text("x".repeat(33))),
            Err(SubmitError::TooLong {
                key: SettingKey::WifiSsid,
                max: 32
            })
        );
        assert!(matches!(
            handle.submit(SettingKey::WifiPass, SettingValue::Text("short".into())),
            Err(SubmitError::OutOfRange { .. })
        ));
        assert!(handle
            .submit(SettingKey::WifiPass, SettingValue::Text(String::new()))
            .is_ok());
        assert!(handle
            .submit(SettingKey::WifiSsid, SettingValue::Text("x".repeat(32)))
            .is_ok());
    }

    #[test]
    fn rejected_input_never_reaches_store() {
        let (mut service, handle, storage, _output) = service();
        let _ = handle.submit(SettingKey::CloseAp, SettingValue::Text("yes".into()));
        assert_eq!(service.poll(), 0);
        assert_eq!(storage.writes(), 0);
    }

    #[test]
    fn submit_after_service_dropped_reports_closed() {
        let (service, handle, _storage, _output) = service();
        drop(service);
        assert_eq!(handle.submit(SettingKey::CloseAp, on()), Err(SubmitError::Closed));
    }
}
