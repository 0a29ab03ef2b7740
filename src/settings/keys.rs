use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::store::StoreError;

/// The closed set of configuration keys persisted by the node.
///
/// | Key            | Kind | Default |
/// |----------------|------|---------|
/// | `wifi_ssid`    | text | `""`    |
/// | `wifi_pass`    | text | `""`    |
/// | `close_ap`     | flag | `false` |
/// | `switch_state` | flag | `false` |
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    WifiSsid,
    WifiPass,
    CloseAp,
    SwitchState,
}

/// The value type a key accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Flag,
}

/// A single configuration value.
///
/// Serialized untagged so the stored and wire form is a bare JSON string or
/// boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SettingValue {
    Text(String),
    Flag(bool),
}

impl SettingKey {
    pub const COUNT: usize = 4;

    pub const ALL: [SettingKey; Self::COUNT] = [
        SettingKey::WifiSsid,
        SettingKey::WifiPass,
        SettingKey::CloseAp,
        SettingKey::SwitchState,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::WifiSsid => "wifi_ssid",
            SettingKey::WifiPass => "wifi_pass",
            SettingKey::CloseAp => "close_ap",
            SettingKey::SwitchState => "switch_state",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            SettingKey::WifiSsid | SettingKey::WifiPass => ValueKind::Text,
            SettingKey::CloseAp | SettingKey::SwitchState => ValueKind::Flag,
        }
    }

    pub fn default_value(self) -> SettingValue {
        match self.kind() {
            ValueKind::Text => SettingValue::Text(String::new()),
            ValueKind::Flag => SettingValue::Flag(false),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StoreError::UnknownKey(s.to_owned()))
    }
}

impl SettingValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            SettingValue::Text(_) => ValueKind::Text,
            SettingValue::Flag(_) => ValueKind::Flag,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            SettingValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            SettingValue::Flag(b) => Some(*b),
            SettingValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Text => "text",
            ValueKind::Flag => "flag",
        })
    }
}
