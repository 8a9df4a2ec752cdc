//! Structured logging field names and subscriber setup for mnema.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log queries work across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-item iteration, high-volume data |

use tracing_subscriber::EnvFilter;

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "crypto", "privacy", "index", "search", "db", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "ingest_file", "fused_search", "secure_delete"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Catalog item id being operated on.
pub const ITEM_ID: &str = "item_id";

/// Embedding space ("image" / "text").
pub const SPACE: &str = "space";

/// File path being operated on.
pub const FILE_PATH: &str = "file_path";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or sweep.
pub const RESULT_COUNT: &str = "result_count";

/// Number of vectors in an index after an operation.
pub const INDEX_SIZE: &str = "index_size";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Initialize a tracing subscriber from `RUST_LOG` (default `info`).
///
/// Called once at process startup by binaries and long-lived test harnesses;
/// repeated calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
