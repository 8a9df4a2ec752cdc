//! Maintenance sweeps: orphan cleanup, double-encryption repair, reindex.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use mnema_core::{
    EmbeddingSpace, Error, EventBus, ImageEmbedder, ItemKind, Result, ServerEvent, TextEmbedder,
};
use mnema_crypto::{CipherService, RepairOutcome};
use mnema_db::ItemStore;
use mnema_index::IndexManager;

/// Runs the maintenance sweeps over catalog and files.
pub struct Maintenance {
    items: ItemStore,
    cipher: Arc<CipherService>,
    indexes: Arc<IndexManager>,
    image_embedder: Arc<dyn ImageEmbedder>,
    text_embedder: Arc<dyn TextEmbedder>,
    bus: EventBus,
}

impl Maintenance {
    pub fn new(
        items: ItemStore,
        cipher: Arc<CipherService>,
        indexes: Arc<IndexManager>,
        image_embedder: Arc<dyn ImageEmbedder>,
        text_embedder: Arc<dyn TextEmbedder>,
        bus: EventBus,
    ) -> Self {
        Self {
            items,
            cipher,
            indexes,
            image_embedder,
            text_embedder,
            bus,
        }
    }

    /// Remove catalog rows whose file no longer exists on disk, and
    /// tombstone their vectors. Returns how many rows were removed.
    #[instrument(skip(self))]
    pub async fn cleanup_orphans(&self) -> Result<usize> {
        let mut removed = 0;
        for item in self.items.list_all().await? {
            if Path::new(&item.file_path).exists() {
                continue;
            }
            warn!(item_id = item.id, path = %item.file_path, "file missing, removing row");
            self.indexes.remove_item(item.id).await?;
            if self.items.delete(item.id).await? {
                removed += 1;
            }
        }

        self.bus.emit(ServerEvent::OrphansCleaned { removed });
        info!(removed, "orphan cleanup finished");
        Ok(removed)
    }

    /// Scan every stored file and collapse doubly-encrypted ones to a
    /// single layer. Returns `(scanned, repaired)`.
    ///
    /// Safe to re-run: a healthy file is read, probed, and left alone.
    #[instrument(skip(self))]
    pub async fn repair_double_encryption(&self) -> Result<(usize, usize)> {
        let mut scanned = 0;
        let mut repaired = 0;
        for item in self.items.list_all().await? {
            let path = Path::new(&item.file_path);
            if !path.exists() {
                continue;
            }
            scanned += 1;
            match self.cipher.repair_double_encryption(path) {
                Ok(RepairOutcome::Repaired) => {
                    info!(item_id = item.id, path = %item.file_path, "repaired double encryption");
                    repaired += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(item_id = item.id, path = %item.file_path, error = %e, "repair failed");
                }
            }
            tokio::task::yield_now().await;
        }

        self.bus.emit(ServerEvent::RepairFinished { scanned, repaired });
        info!(scanned, repaired, "repair sweep finished");
        Ok((scanned, repaired))
    }

    /// Rebuild one vector index from the catalog.
    ///
    /// Only consented items are re-embedded; revoked items fall out of
    /// the index for good here. An item whose file or transcript fails
    /// to decrypt is skipped with a warning, it never aborts the sweep.
    /// Returns the new vector count.
    #[instrument(skip(self))]
    pub async fn reindex(&self, space: EmbeddingSpace) -> Result<usize> {
        // Embed outside the index lock; swapping in is quick.
        let mut embeddings: Vec<(i64, Vec<f32>)> = Vec::new();
        for item in self.items.list_all().await? {
            if !item.has_consent {
                continue;
            }
            match self.embed_for(space, &item).await {
                Ok(Some(vector)) => embeddings.push((item.id, vector)),
                Ok(None) => {}
                Err(e) => {
                    warn!(item_id = item.id, path = %item.file_path, error = %e, "reindex skipping item");
                }
            }
            tokio::task::yield_now().await;
        }

        self.items.clear_index_ids(space).await?;
        let vectors = self.indexes
            .rebuild(space, |index| {
                let mut count = 0;
                for (item_id, vector) in &embeddings {
                    index.add_embedding(*item_id, vector)?;
                    count += 1;
                }
                Ok(count)
            })
            .await?;

        // Re-record the fresh internal ids; append order matches.
        for (internal, (item_id, _)) in embeddings.iter().enumerate() {
            self.items
                .set_index_id(*item_id, space, internal as i64)
                .await?;
        }

        self.bus.emit(ServerEvent::IndexRebuilt { space, vectors });
        Ok(vectors)
    }

    /// Decrypt and embed one item for the given space. `Ok(None)` when
    /// the item does not participate in that space.
    async fn embed_for(
        &self,
        space: EmbeddingSpace,
        item: &mnema_core::Item,
    ) -> Result<Option<Vec<f32>>> {
        match space {
            EmbeddingSpace::Image => {
                if item.kind != ItemKind::Photo {
                    return Ok(None);
                }
                let plaintext = self
                    .cipher
                    .decrypt_file(Path::new(&item.file_path))
                    .map_err(|e| Error::Crypto(e.to_string()))?;
                self.image_embedder.embed_image(&plaintext).await
            }
            EmbeddingSpace::Text => {
                let Some(stored) = item.transcript.as_deref() else {
                    return Ok(None);
                };
                let transcript = self
                    .cipher
                    .decrypt_string(stored)
                    .map_err(|e| Error::Decryption(e.to_string()))?;
                self.text_embedder.embed_text(&transcript).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnema_core::defaults::{IMAGE_EMBED_DIMENSION, TEXT_EMBED_DIMENSION};
    use mnema_core::traits::mock::{MockImageEmbedder, MockTextEmbedder};
    use mnema_core::NewItem;
    use mnema_crypto::{is_encrypted, MasterKey};
    use mnema_db::{hash_content, Database};
    use mnema_index::{HnswParams, IndexKind};
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        maintenance: Maintenance,
        items: ItemStore,
        cipher: Arc<CipherService>,
        indexes: Arc<IndexManager>,
        image: Arc<MockImageEmbedder>,
        dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let db = Database::connect_in_memory().await.unwrap();
        let items = db.items();
        let cipher = Arc::new(CipherService::new(
            MasterKey::load_or_create(dir.path().join("secret.key")).unwrap(),
        ));
        let indexes = Arc::new(IndexManager::open(
            dir.path(),
            IndexKind::Flat,
            HnswParams::default(),
        ));
        let image = Arc::new(MockImageEmbedder::new(IMAGE_EMBED_DIMENSION));
        let text = Arc::new(MockTextEmbedder::new(TEXT_EMBED_DIMENSION));

        let maintenance = Maintenance::new(
            items.clone(),
            cipher.clone(),
            indexes.clone(),
            image.clone(),
            text,
            EventBus::new(),
        );
        Fixture { maintenance, items, cipher, indexes, image, dir }
    }

    async fn seed_item(f: &Fixture, name: &str, bytes: &[u8], consent: bool) -> i64 {
        let path = f.dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        f.cipher.encrypt_file_in_place(&path).unwrap();
        f.items
            .create(&NewItem {
                file_path: path.to_string_lossy().into_owned(),
                file_hash: hash_content(bytes),
                kind: ItemKind::Photo,
                has_consent: consent,
                is_rotated: false,
                created_at: "2025-06-15T10:00:00Z".parse().unwrap(),
                latitude: None,
                longitude: None,
                transcript: None,
            })
            .await
            .unwrap()
    }

    fn axis_vec(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; IMAGE_EMBED_DIMENSION];
        v[axis] = 1.0;
        v
    }

    #[tokio::test]
    async fn test_cleanup_orphans() {
        let f = fixture().await;
        let kept = seed_item(&f, "kept.jpg", b"kept", true).await;

        // Row whose file never existed
        let orphan = f
            .items
            .create(&NewItem {
                file_path: f.dir.path().join("gone.jpg").to_string_lossy().into_owned(),
                file_hash: hash_content(b"gone"),
                kind: ItemKind::Photo,
                has_consent: true,
                is_rotated: false,
                created_at: "2025-06-15T10:00:00Z".parse().unwrap(),
                latitude: None,
                longitude: None,
                transcript: None,
            })
            .await
            .unwrap();

        assert_eq!(f.maintenance.cleanup_orphans().await.unwrap(), 1);
        assert!(f.items.get(kept).await.unwrap().is_some());
        assert!(f.items.get(orphan).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repair_sweep_fixes_double_layer() {
        let f = fixture().await;
        seed_item(&f, "healthy.jpg", b"healthy", true).await;

        // Manufacture a doubly-sealed file
        let broken = f.dir.path().join("broken.jpg");
        std::fs::write(&broken, b"broken bytes").unwrap();
        f.cipher.encrypt_file_in_place(&broken).unwrap();
        let once = std::fs::read(&broken).unwrap();
        std::fs::write(&broken, f.cipher.encrypt_bytes(&once).unwrap()).unwrap();
        f.items
            .create(&NewItem {
                file_path: broken.to_string_lossy().into_owned(),
                file_hash: hash_content(b"broken bytes"),
                kind: ItemKind::Photo,
                has_consent: true,
                is_rotated: false,
                created_at: "2025-06-15T10:00:00Z".parse().unwrap(),
                latitude: None,
                longitude: None,
                transcript: None,
            })
            .await
            .unwrap();

        let (scanned, repaired) = f.maintenance.repair_double_encryption().await.unwrap();
        assert_eq!(scanned, 2);
        assert_eq!(repaired, 1);

        // One layer remains and decrypts to the original bytes
        let on_disk = std::fs::read(&broken).unwrap();
        assert!(is_encrypted(&on_disk));
        assert_eq!(f.cipher.decrypt_bytes(&on_disk).unwrap(), b"broken bytes");

        // Second sweep finds nothing to fix
        let (_, repaired) = f.maintenance.repair_double_encryption().await.unwrap();
        assert_eq!(repaired, 0);
    }

    #[tokio::test]
    async fn test_reindex_skips_unconsented() {
        let f = fixture().await;
        let consented = seed_item(&f, "yes.jpg", b"yes bytes", true).await;
        seed_item(&f, "no.jpg", b"no bytes", false).await;
        f.image.insert_image(b"yes bytes".to_vec(), axis_vec(0));
        f.image.insert_image(b"no bytes".to_vec(), axis_vec(1));

        let vectors = f.maintenance.reindex(EmbeddingSpace::Image).await.unwrap();
        assert_eq!(vectors, 1);

        let hits = f
            .indexes
            .search(EmbeddingSpace::Image, &axis_vec(0), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, consented);

        // Fresh internal id recorded on the item
        let item = f.items.get(consented).await.unwrap().unwrap();
        assert_eq!(item.image_index_id, Some(0));
    }

    #[tokio::test]
    async fn test_reindex_skips_undecryptable_file() {
        let f = fixture().await;
        let healthy = seed_item(&f, "healthy.jpg", b"healthy bytes", true).await;
        f.image.insert_image(b"healthy bytes".to_vec(), axis_vec(0));

        // File on disk that never went through encryption
        let raw = f.dir.path().join("raw.jpg");
        std::fs::write(&raw, b"raw plaintext").unwrap();
        f.items
            .create(&NewItem {
                file_path: raw.to_string_lossy().into_owned(),
                file_hash: hash_content(b"raw plaintext"),
                kind: ItemKind::Photo,
                has_consent: true,
                is_rotated: false,
                created_at: "2025-06-15T10:00:00Z".parse().unwrap(),
                latitude: None,
                longitude: None,
                transcript: None,
            })
            .await
            .unwrap();

        // The sweep skips the broken file and still indexes the rest
        let vectors = f.maintenance.reindex(EmbeddingSpace::Image).await.unwrap();
        assert_eq!(vectors, 1);

        let hits = f
            .indexes
            .search(EmbeddingSpace::Image, &axis_vec(0), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, healthy);
    }
}
