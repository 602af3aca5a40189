use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::mailer::MailError;
use crate::recognizer::RecognizerError;
use crate::store::StoreError;

/// Request-level failure taxonomy. Every variant maps to a status code and
/// a JSON `{"error": ...}` body; internal detail is logged, never exposed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("frame processing failed")]
    Delegate(#[source] RecognizerError),
    #[error("{0}")]
    Disabled(&'static str),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Delegate(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Disabled(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Delegate(source) => {
                tracing::error!(error = %source, "frame delegate failed");
            }
            ApiError::Internal(source) => {
                tracing::error!(error = %source, "unhandled internal error");
            }
            _ => {}
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::DuplicateStudent => {
                ApiError::Conflict("a student with this id already exists".to_string())
            }
            StoreError::Sqlite(_) | StoreError::Pool(_) => {
                ApiError::Internal(anyhow::Error::new(e))
            }
        }
    }
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        match e {
            MailError::NotConfigured => ApiError::Disabled("email is not configured"),
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}
