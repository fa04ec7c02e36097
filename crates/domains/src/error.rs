//! # AppError
//!
//! Centralized error handling for the platform client.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type surfaced by the service layer.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Topic, Reply, Conversation)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty content, wrong email domain)
    #[error("validation error: {0}")]
    Validation(String),

    /// No signed-in actor; the UI should surface a sign-in prompt
    #[error("authentication required")]
    Unauthenticated,

    /// The actor is signed in but not allowed to perform the action
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists (e.g., duplicate friend request)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Remote call failed for a reason other than a benign constraint race
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

/// A specialized Result type for the platform client.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Transient failures are worth retrying; everything else fails fast.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::OperationFailed(_))
    }

    /// Default mapping for backend errors a service has no special
    /// handling for. Constraint races that a service treats as benign
    /// must be matched before reaching this.
    pub fn backend(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AppError::Conflict("row already exists".into()),
            StoreError::MissingRow => AppError::NotFound("record".into(), "unknown".into()),
            StoreError::Denied => AppError::Forbidden("denied by backend policy".into()),
            StoreError::Rejected(msg) => AppError::Validation(msg),
            StoreError::Unavailable(msg) => AppError::OperationFailed(msg),
        }
    }
}

/// Failures at the raw backend boundary, before the service layer has
/// decided what they mean.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Uniqueness constraint violated (SQLSTATE 23505)
    #[error("duplicate row")]
    Duplicate,

    /// Referenced row does not exist (SQLSTATE 23503)
    #[error("missing row")]
    MissingRow,

    /// Row-level security or credential rejection
    #[error("access denied")]
    Denied,

    /// Backend-side validation rejected the payload (e.g., weak password)
    #[error("rejected: {0}")]
    Rejected(String),

    /// Transport or server failure
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Classifies a raw SQLSTATE code from the backend's error payload.
    pub fn from_sqlstate(code: &str, detail: impl Into<String>) -> Self {
        match code {
            "23505" => StoreError::Duplicate,
            "23503" => StoreError::MissingRow,
            _ => StoreError::Unavailable(format!("sqlstate {}: {}", code, detail.into())),
        }
    }
}
