use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::errors::ApiError;
use crate::{
    settings::{SettingKey, SettingValue, SettingsView},
    snapshot::Reading,
};

/// Shown instead of a stored Wi-Fi passphrase.
pub const MASKED_PASSWORD: &str = "********";

/// Body of `GET /weather`.
///
/// Values are rounded to two decimal places and emitted as JSON numbers, so
/// 21.5 °C is `21.5` and 1013.2 hPa is `1013.2`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WeatherDto {
    /// Degrees Celsius
    pub temp: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    /// Hectopascals; omitted on nodes without a barometer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

impl TryFrom<&Reading> for WeatherDto {
    type Error = ApiError;

    fn try_from(r: &Reading) -> Result<Self, ApiError> {
        let finite = |v: f64| v.is_finite().then_some(v);
        let field = |v: f64| finite(v).map(round2).ok_or(ApiError::SensorUnavailable);

        Ok(Self {
            temp: field(r.temperature)?,
            humidity: field(r.humidity)?,
            pressure: r.pressure.map(field).transpose()?,
        })
    }
}

/// Rounds to two decimal places. Magnitudes too large to scale by 100 have no
/// fractional part left and are returned as is.
fn round2(v: f64) -> f64 {
    let scaled = v * 100.0;
    if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        v
    }
}

/// Body of `GET /settings`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingsDto {
    pub wifi_ssid: String,
    /// `********` when a passphrase is stored, empty otherwise
    pub wifi_pass: String,
    pub close_ap: bool,
    pub switch_state: bool,
    /// False while the last write to storage failed
    pub durable: bool,
}

impl From<SettingsView> for SettingsDto {
    fn from(view: SettingsView) -> Self {
        let text = |k: SettingKey| {
            view.values
                .get(&k)
                .and_then(SettingValue::as_text)
                .unwrap_or_default()
                .to_owned()
        };
        let flag = |k: SettingKey| {
            view.values
                .get(&k)
                .and_then(SettingValue::as_flag)
                .unwrap_or_default()
        };

        let wifi_pass = if text(SettingKey::WifiPass).is_empty() {
            String::new()
        } else {
            MASKED_PASSWORD.to_owned()
        };

        Self {
            wifi_ssid: text(SettingKey::WifiSsid),
            wifi_pass,
            close_ap: flag(SettingKey::CloseAp),
            switch_state: flag(SettingKey::SwitchState),
            durable: view.durable,
        }
    }
}

/// Request body for `POST /settings/{key}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SettingUpdateRequest {
    /// A string for `wifi_ssid`/`wifi_pass`, a boolean for `close_ap`/`switch_state`.
    pub value: SettingValue,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthDto {
    pub status: String,
    pub settings_durable: bool,
    /// When the last sampling cycle ran; null before the first one
    pub last_sample: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn reading(temperature: f64, humidity: f64, pressure: Option<f64>) -> Reading {
        Reading {
            temperature,
            humidity,
            pressure,
            sampled_at: None,
        }
    }

    #[test]
    fn weather_rounds_to_two_places() {
        let dto = WeatherDto::try_from(&reading(21.456, 48.004, Some(1013.204))).unwrap();
        assert_eq!(dto.temp, 21.46);
        assert_eq!(dto.humidity, 48.0);
        assert_eq!(dto.pressure, Some(1013.2));
    }

    #[test]
    fn weather_json_without_barometer_has_no_pressure_key() {
        let dto = WeatherDto::try_from(&reading(21.5, 48.0, None)).unwrap();
        assert_eq!(
            serde_json::to_string(&dto).unwrap(),
            r#"{"temp":21.5,"humidity":48.0}"#
        );
    }

    #[test]
    fn any_nan_field_is_unavailable() {
        for r in [
            reading(f64::NAN, 48.0, Some(1013.2)),
            reading(21.5, f64::NAN, Some(1013.2)),
            reading(21.5, 48.0, Some(f64::NAN)),
        ] {
            assert!(matches!(
                WeatherDto::try_from(&r),
                Err(ApiError::SensorUnavailable)
            ));
        }
    }

    #[test]
    fn huge_values_stay_numeric() {
        let dto = WeatherDto::try_from(&reading(1e307, -1e307, Some(f64::MAX))).unwrap();
        assert_eq!(dto.temp, 1e307);
        assert_eq!(dto.humidity, -1e307);
        assert_eq!(dto.pressure, Some(f64::MAX));

        let json: serde_json::Value = serde_json::to_value(&dto).unwrap();
        assert!(json["temp"].is_f64());
        assert!(json["pressure"].is_f64());
    }

    #[test]
    fn infinite_field_is_unavailable() {
        for r in [
            reading(f64::INFINITY, 48.0, Some(1013.2)),
            reading(21.5, f64::NEG_INFINITY, None),
            reading(21.5, 48.0, Some(f64::INFINITY)),
        ] {
            assert!(matches!(
                WeatherDto::try_from(&r),
                Err(ApiError::SensorUnavailable)
            ));
        }
    }

    #[test]
    fn settings_dto_masks_password() {
        let mut values = BTreeMap::new();
        values.insert(SettingKey::WifiSsid, SettingValue::Text("loft".into()));
        values.insert(SettingKey::WifiPass, SettingValue::Text("supersecret".into()));
        values.insert(SettingKey::CloseAp, SettingValue::Flag(true));
        values.insert(SettingKey::SwitchState, SettingValue::Flag(false));

        let dto = SettingsDto::from(SettingsView {
            values,
            durable: true,
        });
        assert_eq!(dto.wifi_ssid, "loft");
        assert_eq!(dto.wifi_pass, MASKED_PASSWORD);
        assert!(dto.close_ap);
        assert!(!dto.switch_state);
    }
}
