use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio::task::JoinError;

use minibrs_core::MinibrsError;

/// An error rendered as `{"error": message}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<MinibrsError> for ApiError {
    fn from(e: MinibrsError) -> Self {
        match e {
            MinibrsError::Validation(message) => Self::bad_request(message),
            MinibrsError::InvalidId(_) => Self::bad_request("Invalid UUID format"),
            e if e.is_not_found() => Self::not_found(e.to_string()),
            e if e.is_client_error() => Self::bad_request(e.to_string()),
            e => {
                tracing::error!(error = %e, kind = e.kind(), "request failed");
                Self::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                tracing::debug!(error = %rejection.body_text(), "rejected request body");
                Self::bad_request("Invalid request body")
            }
            other => Self::new(other.status(), other.body_text()),
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(e: JoinError) -> Self {
        tracing::error!(error = %e, "blocking task failed");
        Self::internal()
    }
}
