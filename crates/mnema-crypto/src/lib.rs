//! # mnema-crypto
//!
//! At-rest encryption for the mnema archive.
//!
//! One symmetric master key encrypts every stored file and every sensitive
//! text field (transcripts, summaries). The key is created on first use and
//! lives in a 0600-permission key file.
//!
//! ## Cryptographic Primitives
//!
//! - **Symmetric cipher**: AES-256-GCM (AEAD)
//! - **Random generation**: OS CSPRNG via `rand`
//!
//! ## File Format (MNENC01)
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │ Magic: "MNENC01\n" (8 bytes)                    │
//! ├─────────────────────────────────────────────────┤
//! │ Nonce (12 bytes)                                │
//! ├─────────────────────────────────────────────────┤
//! │ Ciphertext + GCM auth tag (AES-256-GCM)         │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! The envelope is self-describing: the magic distinguishes "not encrypted"
//! without a decrypt attempt, and the authentication tag makes "wrong key or
//! corrupt" a hard failure rather than plaintext-looking garbage. Both are
//! what lets [`CipherService::probe`] drive the already-encrypted guard and
//! the double-encryption repair without false positives.
//!
//! ## Examples
//!
//! ```rust
//! use mnema_crypto::{CipherService, MasterKey};
//!
//! # let dir = tempfile::tempdir().unwrap();
//! # let key_path = dir.path().join("secret.key");
//! let key = MasterKey::load_or_create(&key_path).unwrap();
//! let cipher = CipherService::new(key);
//!
//! let sealed = cipher.encrypt_bytes(b"holiday photo").unwrap();
//! assert_eq!(cipher.decrypt_bytes(&sealed).unwrap(), b"holiday photo");
//! ```

pub mod cipher;
pub mod detect;
pub mod error;
pub mod format;
pub mod keyfile;
pub mod service;

// Re-export commonly used types
pub use detect::{detect_format, is_encrypted};
pub use error::{CryptoError, CryptoResult};
pub use format::{base64_decode, base64_encode, FileFormat, MAGIC};
pub use keyfile::MasterKey;
pub use service::{CipherService, Probe, RepairOutcome};
