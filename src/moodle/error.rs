//! Failure shapes for calls to a Moodle instance

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Timeout,
    HttpError,
    ConnectionError,
    RemoteException,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Timeout => "timeout",
            ErrorCode::HttpError => "http_error",
            ErrorCode::ConnectionError => "connection_error",
            ErrorCode::RemoteException => "remote_exception",
            ErrorCode::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call, already classified. Nothing from the transport leaks
/// past this type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: ErrorCode,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Application-level error reported by Moodle itself
    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RemoteException, message)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::new(
                ErrorCode::Timeout,
                "Connection timeout - please check your Moodle URL",
            )
        } else if let Some(status) = e.status() {
            RemoteError::new(ErrorCode::HttpError, format!("HTTP error {}", status.as_u16()))
        } else if e.is_decode() {
            RemoteError::new(ErrorCode::Unknown, "Invalid response from Moodle")
        } else {
            RemoteError::new(ErrorCode::ConnectionError, "Failed to connect to Moodle")
        }
    }
}

/// Outcome of each remote procedure call
pub type RemoteCallResult<T = serde_json::Value> = Result<T, RemoteError>;

/// Rejected or failed login
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} ({errorcode})")]
pub struct AuthFailure {
    pub message: String,
    /// Moodle's own `errorcode` when it sent one, else an [`ErrorCode`] name
    pub errorcode: String,
}

impl From<RemoteError> for AuthFailure {
    fn from(e: RemoteError) -> Self {
        Self {
            message: e.message,
            errorcode: e.code.as_str().to_string(),
        }
    }
}
