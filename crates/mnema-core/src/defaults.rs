//! Centralized default constants for the mnema system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers. Values that make sense to override at runtime have a
//! documented environment variable next to the constant; `*Config::from_env`
//! constructors read them.

// =============================================================================
// SECURITY
// =============================================================================

/// Default path of the symmetric master key file.
/// Override: `MNEMA_KEY_PATH`.
pub const KEY_PATH: &str = "secret.key";

/// Size of the master key in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Default path of the privacy audit log.
/// Override: `MNEMA_AUDIT_LOG`.
pub const AUDIT_LOG_PATH: &str = "privacy_audit.log";

/// Default number of audit log lines returned by the audit view.
pub const AUDIT_LOG_TAIL: usize = 50;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding vector dimension for the image space (CLIP ViT-B/32).
pub const IMAGE_EMBED_DIMENSION: usize = 512;

/// Default embedding vector dimension for the text space (MiniLM-L6).
pub const TEXT_EMBED_DIMENSION: usize = 384;

// =============================================================================
// VECTOR INDEX
// =============================================================================

/// Default HNSW neighbor count (M). Controls graph connectivity; higher M
/// improves recall at the cost of memory and insert time.
/// Override: `MNEMA_HNSW_NEIGHBORS`.
pub const HNSW_NEIGHBORS: usize = 32;

/// Default HNSW build-time beam width.
pub const HNSW_EF_CONSTRUCTION: usize = 200;

/// Default HNSW query-time beam width.
pub const HNSW_EF_SEARCH: usize = 64;

// =============================================================================
// SEARCH
// =============================================================================

/// Minimum score a semantic candidate must reach to be returned.
/// 0.24 matches the observed production cut-off for CLIP-style scores.
/// Override: `MNEMA_MIN_SEMANTIC_SCORE`.
pub const MIN_SEMANTIC_SCORE: f32 = 0.24;

/// Default number of results for a search.
pub const SEARCH_K: usize = 10;

/// Default radius for coordinate-based spatial search, in kilometers.
pub const SEARCH_RADIUS_KM: f64 = 5.0;

/// Default radius when searching around a resolved place name. Wider than
/// the coordinate default because a geocoded centroid is imprecise.
pub const PLACE_SEARCH_RADIUS_KM: f64 = 20.0;

// =============================================================================
// GEOCODING
// =============================================================================

/// Nominatim endpoint used by the bundled geocoder client.
/// Override: `MNEMA_GEOCODER_URL`.
pub const GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// User-Agent sent with geocoding requests (required by Nominatim's policy).
pub const GEOCODER_USER_AGENT: &str = "mnema-archive/0.4";

/// Timeout for geocoding requests in seconds.
pub const GEOCODER_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// THUMBNAILS
// =============================================================================

/// Maximum entries held by the in-process thumbnail cache.
/// Override: `MNEMA_THUMBNAIL_CACHE_SIZE`.
pub const THUMBNAIL_CACHE_SIZE: usize = 500;

/// Thumbnail edge length in pixels (square thumbnails).
pub const THUMBNAIL_EDGE: u32 = 200;

// =============================================================================
// EVENTS
// =============================================================================

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;
