//! Collaborator traits for external services.
//!
//! Embedding inference, geocoding, and thumbnail rendering are external
//! collaborators: the core consumes their outputs (a vector, a coordinate,
//! rendered bytes) and owns none of their machinery. Implementations are
//! constructed explicitly at startup and injected; traits with a `ready()`
//! phase load their models there, never lazily on first call.

use async_trait::async_trait;

use crate::error::Result;
use crate::geo::GeoPoint;

/// Produces fixed-length embeddings from free text.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Dimension of the vectors this embedder produces.
    fn dimension(&self) -> usize;

    /// Load the model and verify the backend is reachable. Called once at
    /// startup before the service accepts traffic.
    async fn ready(&self) -> Result<()>;

    /// Embed a text query. `Ok(None)` means no embedding is available for
    /// this input (e.g. empty text); callers degrade to zero candidates.
    async fn embed_text(&self, text: &str) -> Result<Option<Vec<f32>>>;
}

/// Produces fixed-length embeddings from image bytes, plus the text-side
/// projection used for text-to-image search.
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn ready(&self) -> Result<()>;

    /// Embed decoded image bytes into the image space.
    async fn embed_image(&self, bytes: &[u8]) -> Result<Option<Vec<f32>>>;

    /// Embed a text query into the image space (multilingual CLIP-style).
    async fn embed_query(&self, text: &str) -> Result<Option<Vec<f32>>>;
}

/// Resolves a place name to a coordinate.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-text place name. `Ok(None)` covers both "no match"
    /// and recoverable lookup failures; spatial search treats either as an
    /// empty result, never an error.
    async fn geocode(&self, place: &str) -> Result<Option<GeoPoint>>;
}

/// Renders a decrypted media payload into thumbnail bytes.
///
/// Image decoding/resizing is a deterministic single-pass transform owned
/// by the caller's media stack; the core only caches and consent-gates the
/// output.
pub trait ThumbnailRenderer: Send + Sync {
    /// Render plaintext media bytes into an encoded thumbnail.
    fn render(&self, plaintext: &[u8], edge: u32) -> Result<Vec<u8>>;
}

/// Deterministic in-memory collaborators for tests.
#[cfg(feature = "mock")]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{Geocoder, ImageEmbedder, TextEmbedder, ThumbnailRenderer};
    use crate::error::Result;
    use crate::geo::GeoPoint;

    /// Text embedder backed by a fixed text → vector table.
    ///
    /// Unknown inputs return `Ok(None)`, matching a backend that has no
    /// embedding for the query.
    pub struct MockTextEmbedder {
        dimension: usize,
        table: Mutex<HashMap<String, Vec<f32>>>,
    }

    impl MockTextEmbedder {
        pub fn new(dimension: usize) -> Self {
            Self {
                dimension,
                table: Mutex::new(HashMap::new()),
            }
        }

        /// Register the vector returned for a given input text.
        pub fn insert(&self, text: impl Into<String>, vector: Vec<f32>) {
            self.table.lock().unwrap().insert(text.into(), vector);
        }
    }

    #[async_trait]
    impl TextEmbedder for MockTextEmbedder {
        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn ready(&self) -> Result<()> {
            Ok(())
        }

        async fn embed_text(&self, text: &str) -> Result<Option<Vec<f32>>> {
            Ok(self.table.lock().unwrap().get(text).cloned())
        }
    }

    /// Image embedder backed by fixed bytes → vector and query → vector
    /// tables. Image bytes are keyed by their raw content.
    pub struct MockImageEmbedder {
        dimension: usize,
        images: Mutex<HashMap<Vec<u8>, Vec<f32>>>,
        queries: Mutex<HashMap<String, Vec<f32>>>,
    }

    impl MockImageEmbedder {
        pub fn new(dimension: usize) -> Self {
            Self {
                dimension,
                images: Mutex::new(HashMap::new()),
                queries: Mutex::new(HashMap::new()),
            }
        }

        pub fn insert_image(&self, bytes: impl Into<Vec<u8>>, vector: Vec<f32>) {
            self.images.lock().unwrap().insert(bytes.into(), vector);
        }

        pub fn insert_query(&self, text: impl Into<String>, vector: Vec<f32>) {
            self.queries.lock().unwrap().insert(text.into(), vector);
        }
    }

    #[async_trait]
    impl ImageEmbedder for MockImageEmbedder {
        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn ready(&self) -> Result<()> {
            Ok(())
        }

        async fn embed_image(&self, bytes: &[u8]) -> Result<Option<Vec<f32>>> {
            Ok(self.images.lock().unwrap().get(bytes).cloned())
        }

        async fn embed_query(&self, text: &str) -> Result<Option<Vec<f32>>> {
            Ok(self.queries.lock().unwrap().get(text).cloned())
        }
    }

    /// Geocoder backed by a fixed place → coordinate table.
    pub struct MockGeocoder {
        table: Mutex<HashMap<String, GeoPoint>>,
    }

    impl MockGeocoder {
        pub fn new() -> Self {
            Self {
                table: Mutex::new(HashMap::new()),
            }
        }

        pub fn insert(&self, place: impl Into<String>, point: GeoPoint) {
            self.table.lock().unwrap().insert(place.into(), point);
        }
    }

    impl Default for MockGeocoder {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Geocoder for MockGeocoder {
        async fn geocode(&self, place: &str) -> Result<Option<GeoPoint>> {
            Ok(self.table.lock().unwrap().get(place).copied())
        }
    }

    /// Renderer that echoes a truncated copy of the input.
    pub struct MockRenderer;

    impl ThumbnailRenderer for MockRenderer {
        fn render(&self, plaintext: &[u8], edge: u32) -> Result<Vec<u8>> {
            let take = (edge as usize).min(plaintext.len());
            Ok(plaintext[..take].to_vec())
        }
    }
}
