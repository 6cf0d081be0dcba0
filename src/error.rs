//! Error types for NewsHub.

use thiserror::Error;

/// Common error type for NewsHub.
#[derive(Error, Debug)]
pub enum NewsHubError {
    /// Database error.
    ///
    /// Wraps errors from the sqlx backend; conversions are automatic.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Feed fetch or parse error.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Page text extraction error.
    #[error("extraction error: {0}")]
    Extract(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Saved-article store error.
    #[error("saved store error: {0}")]
    SavedStore(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for NewsHubError {
    fn from(e: sqlx::Error) -> Self {
        NewsHubError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for NewsHubError {
    fn from(e: serde_json::Error) -> Self {
        NewsHubError::SavedStore(e.to_string())
    }
}

/// Result type alias for NewsHub operations.
pub type Result<T> = std::result::Result<T, NewsHubError>;
