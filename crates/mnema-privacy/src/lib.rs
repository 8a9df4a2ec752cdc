//! Consent enforcement, privacy audit trail, and secure deletion.
//!
//! All read paths that expose item content go through [`ConsentGuard`],
//! which consults the live consent flag on every call and records the
//! decision in an append-only audit log. Deletion overwrites file bytes
//! before unlinking so the plaintext never lingers on disk.

pub mod audit;
pub mod consent;
pub mod wipe;

pub use audit::{AuditAction, AuditLog};
pub use consent::{ConsentGuard, ConsentStats, DeleteOutcome};
pub use wipe::secure_wipe;
