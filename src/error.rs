//! Error types for the outreach governor.

use thiserror::Error;

/// Main error type for governor operations.
///
/// Rate limit policy violations are never reported here; they are absorbed as
/// blocking waits. Validation failures are returned as data
/// ([`ValidationResult`](crate::validation::ValidationResult)).
#[derive(Error, Debug)]
pub enum GovernorError {
    /// Invalid policy values or settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation referenced a rate limit that was never registered
    #[error("Rate limit not found: {0}")]
    UnknownRateLimit(String),

    /// Settings could not be loaded or deserialized
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// JSON encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for governor operations.
pub type Result<T> = std::result::Result<T, GovernorError>;
