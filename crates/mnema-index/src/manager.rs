//! Shared access to the per-space vector indexes.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::info;

use mnema_core::defaults::{IMAGE_EMBED_DIMENSION, TEXT_EMBED_DIMENSION};
use mnema_core::{EmbeddingSpace, Result};

use crate::index::{HnswParams, IndexKind, VectorIndex};

/// Owns one [`VectorIndex`] per embedding space behind reader-writer
/// locks. Searches share the read side; inserts, removals, and rebuilds
/// take the write side, so queries always observe a complete index.
pub struct IndexManager {
    dir: PathBuf,
    kind: IndexKind,
    params: HnswParams,
    image: RwLock<VectorIndex>,
    text: RwLock<VectorIndex>,
}

impl IndexManager {
    /// Open (or create) both indexes in `dir`.
    pub fn open(dir: &Path, kind: IndexKind, params: HnswParams) -> Self {
        let image = VectorIndex::open(
            dir,
            EmbeddingSpace::Image.index_name(),
            IMAGE_EMBED_DIMENSION,
            kind,
            params,
        );
        let text = VectorIndex::open(
            dir,
            EmbeddingSpace::Text.index_name(),
            TEXT_EMBED_DIMENSION,
            kind,
            params,
        );
        Self {
            dir: dir.to_path_buf(),
            kind,
            params,
            image: RwLock::new(image),
            text: RwLock::new(text),
        }
    }

    fn lock_of(&self, space: EmbeddingSpace) -> &RwLock<VectorIndex> {
        match space {
            EmbeddingSpace::Image => &self.image,
            EmbeddingSpace::Text => &self.text,
        }
    }

    pub fn dimension_of(&self, space: EmbeddingSpace) -> usize {
        match space {
            EmbeddingSpace::Image => IMAGE_EMBED_DIMENSION,
            EmbeddingSpace::Text => TEXT_EMBED_DIMENSION,
        }
    }

    /// Add an embedding, returning its internal id.
    pub async fn add_embedding(
        &self,
        space: EmbeddingSpace,
        item_id: i64,
        vector: &[f32],
    ) -> Result<i64> {
        self.lock_of(space).write().await.add_embedding(item_id, vector)
    }

    /// Nearest live items in one space, `(item_id, score)` best first.
    pub async fn search(
        &self,
        space: EmbeddingSpace,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<(i64, f32)>> {
        self.lock_of(space).read().await.search(query, k)
    }

    /// Tombstone an item in both spaces. Returns total slots cleared.
    pub async fn remove_item(&self, item_id: i64) -> Result<usize> {
        let mut cleared = self.image.write().await.remove_item(item_id)?;
        cleared += self.text.write().await.remove_item(item_id)?;
        Ok(cleared)
    }

    /// Live vector count of one space.
    pub async fn len(&self, space: EmbeddingSpace) -> usize {
        self.lock_of(space).read().await.len()
    }

    /// Rewrite both index file pairs. Mutations already persist
    /// eagerly; this is the explicit shutdown hook.
    pub async fn flush(&self) -> Result<()> {
        self.image.read().await.persist()?;
        self.text.read().await.persist()?;
        Ok(())
    }

    /// Swap in a freshly built index for one space.
    ///
    /// The write lock is held across the whole rebuild callback, so
    /// searchers never see a half-filled index.
    pub async fn rebuild<F>(&self, space: EmbeddingSpace, fill: F) -> Result<usize>
    where
        F: FnOnce(&mut VectorIndex) -> Result<usize>,
    {
        let mut guard = self.lock_of(space).write().await;
        let mut fresh = VectorIndex::open_fresh(
            &self.dir,
            space.index_name(),
            self.dimension_of(space),
            self.kind,
            self.params,
        )?;
        let count = fill(&mut fresh)?;
        *guard = fresh;
        info!(space = %space, count, "vector index rebuilt");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn image_vec(seed: f32) -> Vec<f32> {
        (0..IMAGE_EMBED_DIMENSION)
            .map(|i| ((i as f32) * 0.01 + seed).sin())
            .collect()
    }

    #[tokio::test]
    async fn test_spaces_are_independent() {
        let dir = tempdir().unwrap();
        let manager = IndexManager::open(dir.path(), IndexKind::Flat, HnswParams::default());

        manager
            .add_embedding(EmbeddingSpace::Image, 1, &image_vec(0.0))
            .await
            .unwrap();
        assert_eq!(manager.len(EmbeddingSpace::Image).await, 1);
        assert_eq!(manager.len(EmbeddingSpace::Text).await, 0);
    }

    #[tokio::test]
    async fn test_remove_clears_both_spaces() {
        let dir = tempdir().unwrap();
        let manager = IndexManager::open(dir.path(), IndexKind::Flat, HnswParams::default());

        manager
            .add_embedding(EmbeddingSpace::Image, 1, &image_vec(0.0))
            .await
            .unwrap();
        let text_vec: Vec<f32> = (0..TEXT_EMBED_DIMENSION).map(|i| (i as f32 + 1.0).cos()).collect();
        manager
            .add_embedding(EmbeddingSpace::Text, 1, &text_vec)
            .await
            .unwrap();

        assert_eq!(manager.remove_item(1).await.unwrap(), 2);
        assert_eq!(manager.len(EmbeddingSpace::Image).await, 0);
        assert_eq!(manager.len(EmbeddingSpace::Text).await, 0);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_contents() {
        let dir = tempdir().unwrap();
        let manager = IndexManager::open(dir.path(), IndexKind::Flat, HnswParams::default());

        manager
            .add_embedding(EmbeddingSpace::Image, 1, &image_vec(0.0))
            .await
            .unwrap();
        manager
            .add_embedding(EmbeddingSpace::Image, 2, &image_vec(1.0))
            .await
            .unwrap();

        let count = manager
            .rebuild(EmbeddingSpace::Image, |index| {
                index.add_embedding(5, &image_vec(2.0))?;
                Ok(1)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(manager.len(EmbeddingSpace::Image).await, 1);

        let hits = manager
            .search(EmbeddingSpace::Image, &image_vec(2.0), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 5);
    }
}
