// src/error.rs

//! Unified error handling for the synchronization engine.

use std::fmt;

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// The portal's four ways of rejecting a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// error_login=1 — the username does not exist
    InvalidUser,
    /// error_login=2 — wrong password
    WrongPassword,
    /// error_login=3 — the selected role is not allowed for this account
    RoleNotAllowed,
    /// The redirect target matched no known pattern
    UnrecognizedResponse,
}

impl AuthFailure {
    /// Map a numeric `error_login` code from the redirect target.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => AuthFailure::InvalidUser,
            2 => AuthFailure::WrongPassword,
            3 => AuthFailure::RoleNotAllowed,
            _ => AuthFailure::UnrecognizedResponse,
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AuthFailure::InvalidUser => "invalid user",
            AuthFailure::WrongPassword => "wrong password",
            AuthFailure::RoleNotAllowed => "role not allowed",
            AuthFailure::UnrecognizedResponse => "unrecognized login response",
        };
        f.write_str(msg)
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Login rejected by the portal. Never retried.
    #[error("Authentication failed: {0}")]
    Auth(AuthFailure),

    /// HTTP transport failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// A page did not match the expected structure
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// Every week of the academic year failed to fetch or parse
    #[error("Unable to parse any week of the academic year")]
    UnableToParse,

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed request parameters
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True if this error is transient and a per-week retry makes sense.
    ///
    /// Auth failures are terminal: retrying a rejected credential only locks
    /// the account out.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Parse { .. })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}
