// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error taxonomy shared by the gateway, the link client and the callback flow.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Classified failure of a link operation.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("No active session")]
    Unauthenticated,

    #[error("Session rejected by the server: {0}")]
    Unauthorized(String),

    #[error("Missing required OpenID parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server error (HTTP {status}): {detail}")]
    ServerError { status: u16, detail: String },

    #[error("Steam ID already linked: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unexpected backend response (HTTP {status}): {detail}")]
    UnknownBackendError { status: u16, detail: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Session error: {0}")]
    Session(String),
}

/// Copyable discriminant of [`LinkError`], used for logging and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Unauthorized,
    MissingParameters,
    Transport,
    Timeout,
    ServerError,
    Conflict,
    NotFound,
    UnknownBackendError,
    InvalidResponse,
    Session,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::MissingParameters => "missing_parameters",
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ServerError => "server_error",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::UnknownBackendError => "unknown_backend_error",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::Session => "session",
        };
        f.write_str(name)
    }
}

/// JSON error body returned by the backend on failures.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    /// Best-effort extraction of a readable detail from a raw error body.
    pub fn detail_from_body(body: &str) -> String {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(ErrorResponse {
                error: Some(error), ..
            }) => error,
            Ok(ErrorResponse {
                message: Some(message),
                ..
            }) => message,
            _ => body.trim().to_string(),
        }
    }
}

impl LinkError {
    /// Classify a non-success HTTP status into the taxonomy.
    ///
    /// 401 is classified as `Unauthorized`; the gateway decides whether it
    /// has already retried before surfacing it.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = ErrorResponse::detail_from_body(body);
        match status {
            401 => LinkError::Unauthorized(detail),
            404 => LinkError::NotFound(detail),
            409 => LinkError::Conflict(detail),
            500..=599 => LinkError::ServerError { status, detail },
            _ => LinkError::UnknownBackendError { status, detail },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::Unauthenticated => ErrorKind::Unauthenticated,
            LinkError::Unauthorized(_) => ErrorKind::Unauthorized,
            LinkError::MissingParameters(_) => ErrorKind::MissingParameters,
            LinkError::Transport(_) => ErrorKind::Transport,
            LinkError::Timeout(_) => ErrorKind::Timeout,
            LinkError::ServerError { .. } => ErrorKind::ServerError,
            LinkError::Conflict(_) => ErrorKind::Conflict,
            LinkError::NotFound(_) => ErrorKind::NotFound,
            LinkError::UnknownBackendError { .. } => ErrorKind::UnknownBackendError,
            LinkError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            LinkError::Session(_) => ErrorKind::Session,
        }
    }

    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            LinkError::Unauthenticated => "You are not signed in. Please log in again.".to_string(),
            LinkError::Unauthorized(_) => "Not authorized. Please log in again.".to_string(),
            LinkError::MissingParameters(keys) => format!(
                "Required Steam parameters are missing from the callback URL: {}",
                keys.join(", ")
            ),
            LinkError::Transport(_) => {
                "The server is not responding. Check that the backend is running.".to_string()
            }
            LinkError::Timeout(_) => {
                "The request timed out. The server may be overloaded.".to_string()
            }
            LinkError::ServerError { status: 503, .. } => {
                "Communication with the Steam servers failed.".to_string()
            }
            LinkError::ServerError { .. } => {
                "Internal server error. Please try again.".to_string()
            }
            LinkError::Conflict(_) => "This Steam ID is already linked to another account.".to_string(),
            LinkError::NotFound(_) => "Steam authentication service not found (404).".to_string(),
            LinkError::UnknownBackendError { detail, .. } if !detail.is_empty() => detail.clone(),
            LinkError::UnknownBackendError { .. } => "Unknown error.".to_string(),
            LinkError::InvalidResponse(_) => {
                "The server returned an unexpected response.".to_string()
            }
            LinkError::Session(_) => "Authentication failed.".to_string(),
        }
    }

    /// A conflict will not resolve by retrying with the same parameters;
    /// the user has to start a fresh Steam login instead.
    pub fn requires_new_login(&self) -> bool {
        matches!(self, LinkError::Conflict(_))
    }
}

/// Result type alias for link operations
pub type Result<T> = std::result::Result<T, LinkError>;
