//! # mnema-core
//!
//! Core types, traits, and abstractions for the mnema personal-data archive.
//!
//! This crate provides the foundational data structures and trait definitions
//! that other mnema crates depend on: the shared error taxonomy, the catalog
//! models, geodesic math for spatial search, temporal range types, the
//! collaborator traits (embedding, geocoding, thumbnail rendering), and the
//! process-wide event bus.

pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod geo;
pub mod logging;
pub mod models;
pub mod temporal;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::ArchiveConfig;
pub use error::{Error, Result};
pub use events::{EventBus, ServerEvent};
pub use geo::{geodesic_distance_km, GeoPoint};
pub use models::{EmbeddingSpace, Event, Item, ItemKind, NewEvent, NewItem};
pub use temporal::{DateRange, TimelineStats};
pub use traits::{Geocoder, ImageEmbedder, TextEmbedder, ThumbnailRenderer};
