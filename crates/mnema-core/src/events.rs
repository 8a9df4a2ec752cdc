//! Process-wide event bus for progress notifications.
//!
//! Long-running work (bulk ingestion, maintenance sweeps) reports progress
//! through a broadcast channel instead of blocking its caller. Downstream
//! consumers (a CLI progress bar, a UI, telemetry) subscribe independently;
//! emission never blocks and a bus with no subscribers drops events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::defaults::EVENT_BUS_CAPACITY;
use crate::models::EmbeddingSpace;

/// Events emitted by background work.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A bulk ingestion batch started.
    IngestStarted { total_files: usize },
    /// One file of a batch finished (any outcome).
    IngestProgress {
        processed: usize,
        total_files: usize,
        file_path: String,
        outcome: String,
    },
    /// A bulk ingestion batch finished or was cancelled.
    IngestFinished {
        imported: usize,
        duplicates: usize,
        errors: usize,
        cancelled: bool,
    },
    /// An index was rebuilt from catalog contents.
    IndexRebuilt { space: EmbeddingSpace, vectors: usize },
    /// A maintenance sweep repaired doubly-encrypted files.
    RepairFinished { scanned: usize, repaired: usize },
    /// Orphaned catalog rows were removed.
    OrphansCleaned { removed: usize },
}

/// Timestamped envelope around a [`ServerEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub occurred_at: DateTime<Utc>,
    pub payload: ServerEvent,
}

/// Broadcast bus shared by background workers and their observers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a bus with the default channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BUS_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Emit an event. Lagging or absent subscribers are not an error.
    pub fn emit(&self, payload: ServerEvent) {
        let envelope = EventEnvelope {
            occurred_at: Utc::now(),
            payload,
        };
        let _ = self.tx.send(envelope);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
