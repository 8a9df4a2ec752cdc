//! Consent checks backed by the live catalog flag.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use mnema_core::{Error, Result};
use mnema_db::ItemStore;

use crate::audit::{AuditAction, AuditLog};
use crate::wipe::secure_wipe;

/// Result of one item in a bulk secure delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Missing,
    Failed(String),
}

/// Aggregate consent counters for the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsentStats {
    pub consented: i64,
    pub total: i64,
}

/// Gatekeeper for every path that exposes item content.
///
/// The consent flag is read from the catalog on each call, never cached,
/// so a revocation takes effect on the very next request.
#[derive(Clone)]
pub struct ConsentGuard {
    items: ItemStore,
    audit: Arc<AuditLog>,
}

impl ConsentGuard {
    pub fn new(items: ItemStore, audit: Arc<AuditLog>) -> Self {
        Self { items, audit }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Verify that an item exists and carries consent.
    ///
    /// `context` names the exposure path for the audit trail, e.g.
    /// `"thumbnail"` or `"transcript"`. A missing item and a revoked
    /// item both yield [`Error::ConsentDenied`], so a denial leaks
    /// nothing about whether the item exists. Every check lands in the
    /// audit trail, denials included.
    pub async fn check_consent(&self, item_id: i64, context: &str) -> Result<()> {
        match self.items.consent_of(item_id).await? {
            Some(true) => {
                self.audit.record(
                    AuditAction::ConsentCheck,
                    &format!("item {item_id}: {context}"),
                );
                Ok(())
            }
            _ => {
                self.audit.record(
                    AuditAction::ConsentDenied,
                    &format!("item {item_id}: {context} blocked"),
                );
                Err(Error::ConsentDenied(item_id))
            }
        }
    }

    /// Flip the consent flag. Missing items are a no-op returning `false`.
    pub async fn set_consent(&self, item_id: i64, consent: bool) -> Result<bool> {
        let updated = self.items.set_consent(item_id, consent).await?;
        if updated {
            let action = if consent {
                AuditAction::ConsentGranted
            } else {
                AuditAction::ConsentRevoked
            };
            self.audit.record(action, &format!("item {item_id}"));
            info!(item_id, consent, "consent updated");
        }
        Ok(updated)
    }

    /// Flip the consent flag on many items. Returns the ids that were
    /// actually updated; missing ids are silently skipped.
    pub async fn set_consent_bulk(&self, item_ids: &[i64], consent: bool) -> Result<Vec<i64>> {
        let mut updated = Vec::new();
        for &id in item_ids {
            if self.set_consent(id, consent).await? {
                updated.push(id);
            }
        }
        Ok(updated)
    }

    /// Securely delete many items. Per-item failures are isolated;
    /// each id maps to deleted / missing / the error message.
    pub async fn secure_delete_bulk(&self, item_ids: &[i64]) -> Vec<(i64, DeleteOutcome)> {
        let mut outcomes = Vec::with_capacity(item_ids.len());
        for &id in item_ids {
            let outcome = match self.secure_delete_outcome(id).await {
                Ok(outcome) => outcome,
                Err(e) => DeleteOutcome::Failed(e.to_string()),
            };
            outcomes.push((id, outcome));
        }
        outcomes
    }

    /// Catalog-wide consent counters.
    pub async fn consent_stats(&self) -> Result<ConsentStats> {
        let (consented, total) = self.items.consent_counts().await?;
        Ok(ConsentStats { consented, total })
    }

    /// Securely delete an item: overwrite and unlink its file, then
    /// drop the catalog row. Each outcome lands in the audit trail.
    ///
    /// Returns `false` when the item did not exist, and also when the
    /// wipe failed with an I/O error (audited as DELETE_ERROR, row
    /// kept). Only catalog errors surface as `Err`.
    pub async fn secure_delete(&self, item_id: i64) -> Result<bool> {
        let outcome = self.secure_delete_outcome(item_id).await?;
        Ok(outcome == DeleteOutcome::Deleted)
    }

    async fn secure_delete_outcome(&self, item_id: i64) -> Result<DeleteOutcome> {
        let item = match self.items.get(item_id).await? {
            Some(item) => item,
            None => return Ok(DeleteOutcome::Missing),
        };

        match secure_wipe(Path::new(&item.file_path)) {
            Ok(wiped) => {
                self.audit.record(
                    AuditAction::SecureDelete,
                    &format!("item {item_id}: {} (wiped: {wiped})", item.file_path),
                );
            }
            Err(e) => {
                self.audit.record(
                    AuditAction::DeleteError,
                    &format!("item {item_id}: {} ({e})", item.file_path),
                );
                warn!(item_id, error = %e, "file wipe failed, keeping catalog row");
                return Ok(DeleteOutcome::Failed(e.to_string()));
            }
        }

        self.items.delete(item_id).await?;
        Ok(DeleteOutcome::Deleted)
    }
}
