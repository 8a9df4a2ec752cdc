//! Catalog data models.
//!
//! `Item` is the unit of storage: one photo, audio recording, or note with
//! its own consent flag, content hash, and optional vector-index ids.
//! `Event` is a time/location grouping layered on top of items; the two
//! reference each other through plain id fields with no ownership implied
//! in either direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a stored item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ItemKind {
    /// A photograph.
    #[default]
    Photo,
    /// An audio recording (with an optional transcript).
    Audio,
    /// A free-text note.
    Note,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Photo => write!(f, "photo"),
            Self::Audio => write!(f, "audio"),
            Self::Note => write!(f, "note"),
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "photo" => Ok(Self::Photo),
            "audio" => Ok(Self::Audio),
            "note" => Ok(Self::Note),
            _ => Err(format!("Invalid item kind: {}", s)),
        }
    }
}

/// Embedding space an item participates in. Each space is backed by its own
/// vector index with its own dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingSpace {
    /// Image embeddings (photos).
    Image,
    /// Text embeddings (transcripts, notes).
    Text,
}

impl EmbeddingSpace {
    /// File-name stem used for the persisted index pair of this space.
    pub fn index_name(&self) -> &'static str {
        match self {
            Self::Image => "image_vectors",
            Self::Text => "text_vectors",
        }
    }
}

impl std::fmt::Display for EmbeddingSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A stored item record as read from the catalog.
///
/// `transcript` holds ciphertext at rest; callers decrypt on demand after a
/// consent check. The two `*_index_id` fields are internal vector-index ids,
/// set at most once per space when the item's embedding is inserted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub file_path: String,
    /// Content hash of the plaintext bytes, formatted `sha256:<hex>`.
    pub file_hash: String,
    pub kind: ItemKind,
    /// Privacy gate. Items without consent never leave the store.
    pub has_consent: bool,
    /// Whether orientation correction was applied during ingestion.
    pub is_rotated: bool,
    pub created_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Encrypted transcript/summary text (base64 envelope), if any.
    pub transcript: Option<String>,
    /// Internal id in the image vector index, if embedded.
    pub image_index_id: Option<i64>,
    /// Internal id in the text vector index, if embedded.
    pub text_index_id: Option<i64>,
    /// Back-reference to the event this item was clustered into, if any.
    pub event_id: Option<i64>,
}

impl Item {
    /// Geographic position of the item, when both coordinates are present.
    pub fn position(&self) -> Option<crate::geo::GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(crate::geo::GeoPoint::new(lat, lon)),
            _ => None,
        }
    }
}

/// Fields required to create a new item row.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub file_path: String,
    pub file_hash: String,
    pub kind: ItemKind,
    pub has_consent: bool,
    pub is_rotated: bool,
    pub created_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Already-encrypted transcript text, if any.
    pub transcript: Option<String>,
}

/// A clustered event grouping items in time and place.
///
/// `cover_item_id` points at an item chosen as the event's cover photo;
/// deleting that item nulls the reference, deleting the event nulls the
/// `event_id` back-reference on its items. Items always outlive their event.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub main_location: Option<String>,
    /// Encrypted summary text (base64 envelope), if any.
    pub summary: Option<String>,
    pub cover_item_id: Option<i64>,
}

/// Input for creating an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub main_location: Option<String>,
    /// Already-encrypted summary text, if any.
    pub summary: Option<String>,
}
