//! HTTP error responses.
//!
//! Every failure is rendered as `{"error": "<message>"}` with a status code
//! chosen from the error kind.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use devlog_core::{DevlogError, ErrorKind};
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Handler error wrapping [`DevlogError`].
#[derive(Debug)]
pub struct ApiError(DevlogError);

impl ApiError {
    /// Shorthand for a 400 with the given message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(DevlogError::invalid_request(message))
    }

    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::InvalidRequest | ErrorKind::Database => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DevlogError> for ApiError {
    fn from(err: DevlogError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

/// Result type for JSON handlers.
pub type ApiResult<T> = Result<Json<T>, ApiError>;
