//! Error types for mnema.

use thiserror::Error;

/// Result type alias using mnema's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mnema operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Item not found in the catalog
    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    /// Event not found in the catalog
    #[error("Event not found: {0}")]
    EventNotFound(i64),

    /// Decryption failed - wrong key or corrupted ciphertext
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Encryption or key handling failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Consent is absent or revoked. Exposure boundaries map this to
    /// "not found" so the existence of non-consented data is never confirmed.
    #[error("Consent denied for item {0}")]
    ConsentDenied(i64),

    /// Vector index operation failed
    #[error("Index error: {0}")]
    Index(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Search operation failed
    #[error("Search error: {0}")]
    Search(String),

    /// Geocoding request could not be constructed or decoded
    #[error("Geocode error: {0}")]
    Geocode(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
