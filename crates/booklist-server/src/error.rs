use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use booklist_core::BooklistError;
use serde_json::json;
use tracing::error;

/// A store failure translated for HTTP clients: `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// `failure` is the client-facing message for server-side errors; the
    /// underlying cause is only logged.
    pub fn from_store(err: BooklistError, failure: &'static str) -> Self {
        match err {
            BooklistError::Validation(msg) => Self {
                status: StatusCode::BAD_REQUEST,
                message: msg,
            },
            BooklistError::BookNotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: "Book not found".to_string(),
            },
            other => Self::internal(failure, other),
        }
    }

    pub fn internal(failure: &'static str, cause: impl std::fmt::Display) -> Self {
        error!(error = %cause, "{failure}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: failure.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
