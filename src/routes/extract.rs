//! Request extractors for the `X-Session-ID` header

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::session::Session;
use crate::AppState;

use super::error::ApiError;

pub const SESSION_HEADER: &str = "x-session-id";

/// The raw session id from the request header
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| SessionId(id.to_string()))
            .ok_or(ApiError::MissingSession)
    }
}

/// A live session resolved from the request header
#[derive(Debug, Clone)]
pub struct ActiveSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for ActiveSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionId(id) = SessionId::from_request_parts(parts, state).await?;
        state
            .sessions
            .get(&id)
            .map(ActiveSession)
            .ok_or(ApiError::InvalidSession)
    }
}
