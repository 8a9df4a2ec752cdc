//! Text-to-content semantic search over both embedding spaces.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use mnema_core::{EmbeddingSpace, ImageEmbedder, Result, TextEmbedder};
use mnema_db::ItemStore;
use mnema_index::IndexManager;

/// Searches the image and text vector spaces with one free-text query.
///
/// Both spaces answer the same query: the image space through the
/// query-side projection of the image model, the text space through the
/// sentence embedder. Hits are merged per item, keeping the best score.
pub struct SemanticSearcher {
    items: ItemStore,
    indexes: Arc<IndexManager>,
    text_embedder: Arc<dyn TextEmbedder>,
    image_embedder: Arc<dyn ImageEmbedder>,
    min_score: f32,
}

impl SemanticSearcher {
    pub fn new(
        items: ItemStore,
        indexes: Arc<IndexManager>,
        text_embedder: Arc<dyn TextEmbedder>,
        image_embedder: Arc<dyn ImageEmbedder>,
        min_score: f32,
    ) -> Self {
        Self {
            items,
            indexes,
            text_embedder,
            image_embedder,
            min_score,
        }
    }

    /// Best `k` consented items across both spaces, `(item_id, score)`
    /// descending.
    ///
    /// Index hits are consent-checked against the live catalog flag, so
    /// a revoked item stays invisible even while its vector is still
    /// indexed. An embedder with no vector for the query contributes
    /// nothing; if neither space produces a vector, the result is empty
    /// rather than an error.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<(i64, f32)>> {
        let mut best: HashMap<i64, f32> = HashMap::new();

        if let Some(vector) = self.image_embedder.embed_query(query).await? {
            for (item_id, score) in self.indexes.search(EmbeddingSpace::Image, &vector, k).await? {
                let entry = best.entry(item_id).or_insert(score);
                *entry = entry.max(score);
            }
        }
        if let Some(vector) = self.text_embedder.embed_text(query).await? {
            for (item_id, score) in self.indexes.search(EmbeddingSpace::Text, &vector, k).await? {
                let entry = best.entry(item_id).or_insert(score);
                *entry = entry.max(score);
            }
        }

        let mut candidates: Vec<(i64, f32)> = best
            .into_iter()
            .filter(|&(_, score)| score >= self.min_score)
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut hits = Vec::new();
        for (item_id, score) in candidates {
            if hits.len() >= k {
                break;
            }
            // Stale index entries (deleted or revoked rows) drop out here
            if self.items.consent_of(item_id).await? == Some(true) {
                hits.push((item_id, score));
            }
        }

        debug!(query, hits = hits.len(), "semantic search");
        Ok(hits)
    }
}
