//! Search over the archive: semantic, temporal, spatial, and their fusion.
//!
//! Each clause of a query runs as an independent sub-search; the fusion
//! layer intersects their item sets and enforces consent on the way out.

pub mod fusion;
pub mod geocode;
pub mod semantic;
pub mod spatial;
pub mod temporal;

pub use fusion::{FusedQuery, FusedResults, ScoredItem, SearchEngine};
pub use geocode::NominatimGeocoder;
pub use semantic::SemanticSearcher;
pub use spatial::{SpatialHit, SpatialSearcher};
pub use temporal::TemporalSearcher;
