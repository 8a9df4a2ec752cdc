//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Invalid magic bytes - not an encrypted file.
    #[error("Invalid magic bytes - not an encrypted file")]
    InvalidMagic,

    /// Envelope too short to contain magic + nonce + tag.
    #[error("Truncated envelope: {0} bytes")]
    Truncated(usize),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed - wrong key or corrupted data.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Invalid keyfile format or size.
    #[error("Invalid keyfile: {0}")]
    InvalidKeyfile(String),

    /// Ciphertext string is not valid base64.
    #[error("Invalid base64: {0}")]
    Base64(String),

    /// Decrypted string field is not valid UTF-8.
    #[error("Decrypted text is not valid UTF-8")]
    Utf8,

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
