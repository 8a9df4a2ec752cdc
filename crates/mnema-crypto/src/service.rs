//! The cipher service: envelope encryption over bytes, strings, and files.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::cipher::{aes_gcm_decrypt, aes_gcm_encrypt, generate_nonce};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode, MAGIC, MIN_ENVELOPE_LEN, NONCE_LEN};
use crate::keyfile::MasterKey;

/// Result of a decrypt probe.
///
/// The probe is the typed replacement for "try to decrypt and catch the
/// failure": callers branch on the variant instead of an error path.
#[derive(Debug)]
pub enum Probe {
    /// The data was a valid envelope under this key; here is the plaintext.
    Decrypted(Vec<u8>),
    /// Not our envelope, or sealed under a different key, or corrupt.
    Invalid,
}

/// Outcome of a double-encryption repair pass over one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The file is not encrypted at all; left untouched.
    NotEncrypted,
    /// Exactly one encryption layer; nothing to repair.
    SingleLayer,
    /// Two layers found; the file was rewritten with a single layer.
    Repaired,
}

/// Authenticated encryption service bound to the process master key.
///
/// Constructed once at startup and shared by reference; all methods take
/// `&self` and the key is never exposed.
pub struct CipherService {
    key: MasterKey,
}

impl CipherService {
    /// Create a service around a loaded master key.
    pub fn new(key: MasterKey) -> Self {
        Self { key }
    }

    /// Encrypt a byte payload into a self-describing envelope.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let nonce = generate_nonce();
        let ciphertext = aes_gcm_encrypt(self.key.as_bytes(), &nonce, plaintext)?;

        let mut envelope = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(MAGIC);
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    /// Decrypt an envelope. Fails with [`CryptoError::Decryption`] for a
    /// wrong key or tampered data, and [`CryptoError::InvalidMagic`] when
    /// the data is not our envelope at all.
    pub fn decrypt_bytes(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        if data.len() < MIN_ENVELOPE_LEN {
            return Err(CryptoError::Truncated(data.len()));
        }
        if &data[..MAGIC.len()] != MAGIC {
            return Err(CryptoError::InvalidMagic);
        }

        let nonce: [u8; NONCE_LEN] = data[MAGIC.len()..MAGIC.len() + NONCE_LEN]
            .try_into()
            .expect("slice length checked above");
        let ciphertext = &data[MAGIC.len() + NONCE_LEN..];

        aes_gcm_decrypt(self.key.as_bytes(), &nonce, ciphertext)
    }

    /// Typed decrypt probe: `Decrypted` iff the data is a valid envelope
    /// under the current key.
    pub fn probe(&self, data: &[u8]) -> Probe {
        match self.decrypt_bytes(data) {
            Ok(plaintext) => Probe::Decrypted(plaintext),
            Err(_) => Probe::Invalid,
        }
    }

    /// Encrypt a text field. Empty input passes through unchanged so that
    /// absent/blank fields are never wrapped in an envelope.
    pub fn encrypt_string(&self, plaintext: &str) -> CryptoResult<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        Ok(base64_encode(&self.encrypt_bytes(plaintext.as_bytes())?))
    }

    /// Decrypt a text field produced by [`Self::encrypt_string`]. Empty
    /// input passes through unchanged.
    pub fn decrypt_string(&self, encrypted: &str) -> CryptoResult<String> {
        if encrypted.is_empty() {
            return Ok(String::new());
        }
        let plaintext = self.decrypt_bytes(&base64_decode(encrypted)?)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Utf8)
    }

    /// Encrypt a file on disk in place.
    ///
    /// Probes first: if the file already decrypts under the current key it
    /// is left untouched (logged no-op). The rewrite goes through a sibling
    /// temp file plus rename, so the file is never half-encrypted.
    ///
    /// Returns `true` if the file was encrypted by this call, `false` if it
    /// already was.
    pub fn encrypt_file_in_place(&self, path: impl AsRef<Path>) -> CryptoResult<bool> {
        let path = path.as_ref();
        let data = fs::read(path)?;

        if let Probe::Decrypted(_) = self.probe(&data) {
            warn!(path = %path.display(), "file already encrypted, skipping");
            return Ok(false);
        }

        let envelope = self.encrypt_bytes(&data)?;
        write_atomic(path, &envelope)?;
        debug!(path = %path.display(), bytes = data.len(), "encrypted file in place");
        Ok(true)
    }

    /// Read and decrypt a file.
    pub fn decrypt_file(&self, path: impl AsRef<Path>) -> CryptoResult<Vec<u8>> {
        let data = fs::read(path.as_ref())?;
        self.decrypt_bytes(&data)
    }

    /// Detect and repair a doubly-encrypted file.
    ///
    /// A historical ingestion bug could encrypt an already-encrypted file a
    /// second time. The outer layer is probed; if its plaintext probes as a
    /// valid envelope again, that single inner layer is written back.
    /// Idempotent: on a singly-encrypted file the inner probe fails and the
    /// file is untouched.
    pub fn repair_double_encryption(&self, path: impl AsRef<Path>) -> CryptoResult<RepairOutcome> {
        let path = path.as_ref();
        let data = fs::read(path)?;

        let outer = match self.probe(&data) {
            Probe::Decrypted(inner) => inner,
            Probe::Invalid => return Ok(RepairOutcome::NotEncrypted),
        };

        match self.probe(&outer) {
            Probe::Decrypted(_) => {
                // The outer plaintext is itself a valid envelope: keep that
                // single layer.
                write_atomic(path, &outer)?;
                info!(path = %path.display(), "repaired doubly-encrypted file");
                Ok(RepairOutcome::Repaired)
            }
            Probe::Invalid => Ok(RepairOutcome::SingleLayer),
        }
    }
}

/// Write via temp file + rename so a crash never leaves a partial file.
fn write_atomic(path: &Path, data: &[u8]) -> CryptoResult<()> {
    let tmp = path.with_extension("mnema-tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::is_encrypted;

    fn service(dir: &tempfile::TempDir) -> CipherService {
        CipherService::new(MasterKey::load_or_create(dir.path().join("k.key")).unwrap())
    }

    #[test]
    fn test_bytes_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = service(&dir);

        for payload in [&b""[..], b"x", b"some longer plaintext payload"] {
            let sealed = cipher.encrypt_bytes(payload).unwrap();
            assert_eq!(cipher.decrypt_bytes(&sealed).unwrap(), payload);
        }
    }

    #[test]
    fn test_string_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = service(&dir);

        let sealed = cipher.encrypt_string("bir transkript").unwrap();
        assert_ne!(sealed, "bir transkript");
        assert_eq!(cipher.decrypt_string(&sealed).unwrap(), "bir transkript");
    }

    #[test]
    fn test_empty_string_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = service(&dir);

        assert_eq!(cipher.encrypt_string("").unwrap(), "");
        assert_eq!(cipher.decrypt_string("").unwrap(), "");
    }

    #[test]
    fn test_decrypt_plain_data_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = service(&dir);

        assert!(matches!(
            cipher.decrypt_bytes(b"short"),
            Err(CryptoError::Truncated(_))
        ));
        let long_plain = vec![7u8; 100];
        assert!(matches!(
            cipher.decrypt_bytes(&long_plain),
            Err(CryptoError::InvalidMagic)
        ));
    }

    #[test]
    fn test_probe_tags() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = service(&dir);

        let sealed = cipher.encrypt_bytes(b"data").unwrap();
        assert!(matches!(cipher.probe(&sealed), Probe::Decrypted(p) if p == b"data"));
        assert!(matches!(cipher.probe(b"not an envelope at all..."), Probe::Invalid));
    }

    #[test]
    fn test_encrypt_file_in_place_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = service(&dir);
        let path = dir.path().join("a.jpg");
        fs::write(&path, b"image bytes").unwrap();

        assert!(cipher.encrypt_file_in_place(&path).unwrap());
        let first = fs::read(&path).unwrap();
        assert!(is_encrypted(&first));

        // Second call must be a no-op, leaving the same decryptable content
        assert!(!cipher.encrypt_file_in_place(&path).unwrap());
        assert_eq!(fs::read(&path).unwrap(), first);
        assert_eq!(cipher.decrypt_file(&path).unwrap(), b"image bytes");
    }

    #[test]
    fn test_repair_double_encryption() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = service(&dir);
        let path = dir.path().join("a.jpg");

        // Manufacture the bug: encrypt twice
        let once = cipher.encrypt_bytes(b"image bytes").unwrap();
        let twice = cipher.encrypt_bytes(&once).unwrap();
        fs::write(&path, &twice).unwrap();

        assert_eq!(
            cipher.repair_double_encryption(&path).unwrap(),
            RepairOutcome::Repaired
        );
        assert_eq!(cipher.decrypt_file(&path).unwrap(), b"image bytes");

        // Running the repair again is a no-op
        assert_eq!(
            cipher.repair_double_encryption(&path).unwrap(),
            RepairOutcome::SingleLayer
        );
        assert_eq!(cipher.decrypt_file(&path).unwrap(), b"image bytes");
    }

    #[test]
    fn test_repair_unencrypted_file() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = service(&dir);
        let path = dir.path().join("plain.txt");
        fs::write(&path, b"never encrypted").unwrap();

        assert_eq!(
            cipher.repair_double_encryption(&path).unwrap(),
            RepairOutcome::NotEncrypted
        );
        assert_eq!(fs::read(&path).unwrap(), b"never encrypted");
    }

    #[test]
    fn test_unicode_string_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = service(&dir);

        let text = "günbatımında plajda çekilmiş fotoğraf 📷";
        let sealed = cipher.encrypt_string(text).unwrap();
        assert_eq!(cipher.decrypt_string(&sealed).unwrap(), text);
    }
}
