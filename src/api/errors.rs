use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::settings::SubmitError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// At least one required reading is NaN.
    #[error("Failed to read from sensor")]
    SensorUnavailable,

    #[error("unknown setting key: {0:?}")]
    UnknownKey(String),

    #[error(transparent)]
    Rejected(#[from] SubmitError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            // Plain-text body, no partial data.
            ApiError::SensorUnavailable => {
                return (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
            ApiError::UnknownKey(_) => StatusCode::NOT_FOUND,
            ApiError::Rejected(SubmitError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
