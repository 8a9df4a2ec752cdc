//! Master key storage.
//!
//! The master key is 32 raw bytes in a file readable only by its owner.
//! It is loaded (or created) exactly once at startup and shared read-only
//! for the process lifetime; key material is wiped from memory on drop.

use std::fs;
use std::path::Path;

use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::generate_random;
use crate::error::{CryptoError, CryptoResult};

/// Length of the master key in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// The symmetric master key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Load the key file if it exists, otherwise generate a new key and
    /// persist it with owner-only permissions.
    pub fn load_or_create(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            let data = fs::read(path)?;
            let bytes: [u8; KEY_LEN] = data.as_slice().try_into().map_err(|_| {
                CryptoError::InvalidKeyfile(format!(
                    "expected {} bytes, found {}",
                    KEY_LEN,
                    data.len()
                ))
            })?;
            return Ok(Self { bytes });
        }

        let bytes: [u8; KEY_LEN] = generate_random();
        fs::write(path, bytes)?;
        restrict_permissions(path)?;
        info!(path = %path.display(), "generated new master key");

        Ok(Self { bytes })
    }

    /// Raw key bytes.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> CryptoResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> CryptoResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_key_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");

        assert!(!path.exists());
        let _key = MasterKey::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(fs::read(&path).unwrap().len(), KEY_LEN);
    }

    #[test]
    fn test_second_call_returns_identical_material() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");

        let first = MasterKey::load_or_create(&path).unwrap();
        let second = MasterKey::load_or_create(&path).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");

        let _key = MasterKey::load_or_create(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_rejects_wrong_size_keyfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        fs::write(&path, b"short").unwrap();

        let result = MasterKey::load_or_create(&path);
        assert!(matches!(result, Err(CryptoError::InvalidKeyfile(_))));
    }
}
