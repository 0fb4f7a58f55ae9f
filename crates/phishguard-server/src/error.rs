//! HTTP error mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Errors surfaced to HTTP clients
#[derive(Debug)]
pub enum AppError {
    /// The request body did not match the expected schema
    Validation(String),
    /// The classifier failed; details are logged, not returned
    Inference(phishguard_core::Error),
    NotFound,
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<phishguard_core::Error> for AppError {
    fn from(err: phishguard_core::Error) -> Self {
        match err {
            phishguard_core::Error::InvalidInput(msg) => AppError::Validation(msg),
            other => AppError::Inference(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::Validation(msg) => {
                metrics::counter!("phishguard_errors_total", "kind" => "validation").increment(1);
                (StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            AppError::Inference(err) => {
                error!("Classification failed: {}", err);
                metrics::counter!("phishguard_errors_total", "kind" => "inference").increment(1);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
