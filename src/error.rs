//! Crate-level error types.
//!
//! [`GridError`] unifies every error source (configuration, persistence,
//! HTTP, JSON, exchange replies, catalog rejections) behind a single enum
//! so callers can match on the variant they care about while still using
//! the `?` operator for easy propagation.

use crate::catalog::CatalogError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Configuration could not be read or was invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading or writing the state document failed.
    #[error("io error: {0}")]
    Io(String),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// An HTTP request to the exchange failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response did not have the expected shape.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The exchange answered with a non-zero return code.
    #[error("exchange error {code}: {message}")]
    Exchange { code: i64, message: String },

    /// The instrument catalog rejected an operation.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
