//! Error Handling
//!
//! Unified error types for the engine service layer.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use conviction_advisor::AdvisorError;
use conviction_core::CoreError;
use conviction_research::ThesisError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Advisor backend errors (rate limit, quota, transport)
    #[error("Advisor error: {0}")]
    Advisor(#[from] AdvisorError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<ThesisError> for AppError {
    fn from(err: ThesisError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert AppError to a string suitable for API responses
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
