pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{settings::SettingsHandle, snapshot::SensorSnapshot};

/// Shared handler state. Read access to the sensor snapshot and the settings
/// front door; handlers never own either.
#[derive(Clone)]
pub struct AppState {
    pub snapshot: SensorSnapshot,
    pub settings: SettingsHandle,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/", get(handlers::index))
        .route("/weather", get(handlers::get_weather))
        .route("/settings", get(handlers::get_settings))
        .route("/settings/{key}", post(handlers::update_setting))
        .route("/health", get(handlers::health))
        .with_state(state)
        .split_for_parts();

    router.route(
        "/api-docs/openapi.json",
        get(move || async move { axum::Json(api) }),
    )
}
