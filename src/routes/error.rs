use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to API clients as `{"detail": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session ID required")]
    MissingSession,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    /// Remote retrieval failed; the cause is logged, not returned
    #[error("{0}")]
    Retrieval(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingSession => StatusCode::BAD_REQUEST,
            ApiError::InvalidSession => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Retrieval(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
