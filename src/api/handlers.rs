use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use utoipa::OpenApi;

use super::{
    dto::{HealthDto, SettingUpdateRequest, SettingsDto, WeatherDto},
    errors::ApiError,
    AppState,
};
use crate::settings::{SettingKey, SettingValue};

/// Banner served on `/`.
pub const BANNER: &str = "API is online. Use /weather";

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// Plain-text status banner.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = String, content_type = "text/plain"),
    ),
    tag = "weather"
)]
pub async fn index() -> &'static str {
    BANNER
}

/// Latest sensor readings.
///
/// Fails with `500` and a plain-text body if any reading is currently
/// unavailable; partial data is never returned.
#[utoipa::path(
    get,
    path = "/weather",
    responses(
        (status = 200, description = "Latest readings", body = WeatherDto),
        (status = 500, description = "A sensor reading is unavailable", body = String, content_type = "text/plain"),
    ),
    tag = "weather"
)]
pub async fn get_weather(State(state): State<AppState>) -> Result<Json<WeatherDto>, ApiError> {
    let reading = state.snapshot.latest().await;
    Ok(Json(WeatherDto::try_from(&reading)?))
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Current configuration values, for the settings UI.
#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Current settings", body = SettingsDto),
    ),
    tag = "settings"
)]
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsDto> {
    Json(state.settings.current().into())
}

/// Queue a change to one setting. It is applied on the next station loop
/// iteration.
#[utoipa::path(
    post,
    path = "/settings/{key}",
    params(
        ("key" = SettingKey, Path, description = "Setting key"),
    ),
    request_body = SettingUpdateRequest,
    responses(
        (status = 202, description = "Change queued"),
        (status = 404, description = "Unknown setting key"),
        (status = 422, description = "Value has the wrong type or is out of range"),
        (status = 503, description = "Settings service is not running"),
    ),
    tag = "settings"
)]
pub async fn update_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<SettingUpdateRequest>,
) -> Result<StatusCode, ApiError> {
    let key: SettingKey = key.parse().map_err(|_| ApiError::UnknownKey(key))?;
    state.settings.submit(key, body.value)?;
    Ok(StatusCode::ACCEPTED)
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Liveness plus settings durability and the time of the last sample.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthDto),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_owned(),
        settings_durable: state.settings.current().durable,
        last_sample: state.snapshot.latest().await.sampled_at,
    })
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(index, get_weather, get_settings, update_setting, health),
    components(schemas(WeatherDto, SettingsDto, SettingUpdateRequest, SettingKey, SettingValue, HealthDto)),
    tags(
        (name = "weather",  description = "Sensor readings"),
        (name = "settings", description = "Persistent node configuration"),
        (name = "system",   description = "System endpoints"),
    ),
    info(
        title = "Weather Station API",
        version = "0.1.0",
        description = "HTTP API of a networked temperature/humidity/pressure sensor node"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
