//! Format detection for encrypted files.
//!
//! Magic sniffing answers "does this look like our envelope" without a
//! decrypt attempt. It is necessary but not sufficient: only a successful
//! authenticated decrypt ([`crate::CipherService::probe`]) proves the data
//! was sealed under the current key.

use crate::format::{FileFormat, MAGIC, MIN_ENVELOPE_LEN};

/// Detect the format of a file from its bytes.
pub fn detect_format(data: &[u8]) -> FileFormat {
    if data.len() < MIN_ENVELOPE_LEN {
        return FileFormat::Unencrypted;
    }

    if &data[0..MAGIC.len()] == MAGIC {
        FileFormat::Sealed
    } else {
        FileFormat::Unencrypted
    }
}

/// Check if data carries the at-rest envelope.
pub fn is_encrypted(data: &[u8]) -> bool {
    matches!(detect_format(data), FileFormat::Sealed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_unencrypted() {
        let data = b"Just plain text data, long enough to pass the length check";
        assert_eq!(detect_format(data), FileFormat::Unencrypted);
        assert!(!is_encrypted(data));
    }

    #[test]
    fn test_detect_jpeg_bytes() {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
        data.extend_from_slice(&[0u8; 40]);
        assert_eq!(detect_format(&data), FileFormat::Unencrypted);
    }

    #[test]
    fn test_detect_too_short() {
        assert_eq!(detect_format(b"MNENC01\n"), FileFormat::Unencrypted);
        assert_eq!(detect_format(b""), FileFormat::Unencrypted);
    }

    #[test]
    fn test_detect_sealed() {
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 28]); // nonce + tag worth of padding
        assert_eq!(detect_format(&data), FileFormat::Sealed);
        assert!(is_encrypted(&data));
    }

    #[test]
    fn test_detect_partial_magic() {
        let mut data = b"MNENC0".to_vec();
        data.extend_from_slice(&[0u8; 40]);
        assert_eq!(detect_format(&data), FileFormat::Unencrypted);
    }
}
