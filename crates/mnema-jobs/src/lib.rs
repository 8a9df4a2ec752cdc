//! Background work against the archive: ingestion, maintenance sweeps,
//! and the thumbnail pipeline.
//!
//! Long-running jobs report progress on the shared event bus, yield
//! between files so queries interleave, and honor a cancellation flag
//! between units of work.

pub mod ingest;
pub mod maintenance;
pub mod thumbs;

pub use ingest::{IngestOutcome, IngestRequest, IngestStats, Ingestor};
pub use maintenance::Maintenance;
pub use thumbs::ThumbnailService;
