//! Append-only privacy audit trail.
//!
//! Every consent decision and destructive operation leaves one line:
//!
//! ```text
//! 2025-06-15T10:00:00.123456+00:00 [CONSENT_DENIED] item 42: transcript access blocked
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use tracing::warn;

use mnema_core::Result;

/// Kinds of entries the audit trail records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    ConsentCheck,
    ConsentDenied,
    ConsentGranted,
    ConsentRevoked,
    SecureDelete,
    DeleteError,
}

impl AuditAction {
    /// The bracketed tag written to the log line.
    pub fn tag(&self) -> &'static str {
        match self {
            AuditAction::ConsentCheck => "CONSENT_CHECK",
            AuditAction::ConsentDenied => "CONSENT_DENIED",
            AuditAction::ConsentGranted => "CONSENT_GRANTED",
            AuditAction::ConsentRevoked => "CONSENT_REVOKED",
            AuditAction::SecureDelete => "SECURE_DELETE",
            AuditAction::DeleteError => "DELETE_ERROR",
        }
    }
}

/// File-backed audit log. Writes are line-atomic under a mutex so
/// concurrent recorders never interleave within a line.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. An unwritable log is reported, never fatal:
    /// the guarded operation itself must not fail because auditing did.
    pub fn record(&self, action: AuditAction, detail: &str) {
        let line = format!("{} [{}] {}\n", Utc::now().to_rfc3339(), action.tag(), detail);

        let guard = self.write_lock.lock();
        let result = guard.map_err(|_| ()).and_then(|_g| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .and_then(|mut f| f.write_all(line.as_bytes()))
                .map_err(|_| ())
        });
        if result.is_err() {
            warn!(path = %self.path.display(), action = action.tag(), "audit write failed");
        }
    }

    /// The most recent `n` entries, oldest first. Missing log file
    /// means an empty history. Lines that don't carry a bracketed
    /// action tag (partial writes, foreign content) are skipped.
    pub fn recent(&self, n: usize) -> Result<Vec<String>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<String> = text
            .lines()
            .filter(|line| line.contains(" ["))
            .map(str::to_owned)
            .collect();
        let skip = lines.len().saturating_sub(n);
        Ok(lines.into_iter().skip(skip).collect())
    }
}
