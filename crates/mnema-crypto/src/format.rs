//! Shared envelope format constants and helpers.

use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Magic bytes for the symmetric at-rest format.
pub const MAGIC: &[u8; 8] = b"MNENC01\n";

/// Nonce length for AES-256-GCM.
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Smallest possible envelope: magic + nonce + tag (empty plaintext).
pub const MIN_ENVELOPE_LEN: usize = MAGIC.len() + NONCE_LEN + TAG_LEN;

/// File format type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Symmetric at-rest encryption (MNENC01).
    Sealed,
    /// Unencrypted file.
    Unencrypted,
}

/// Encode bytes as base64.
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode base64 string to bytes.
pub fn base64_decode(data: &str) -> CryptoResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CryptoError::Base64(e.to_string()))
}
