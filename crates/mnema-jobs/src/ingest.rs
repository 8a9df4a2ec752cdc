//! Bulk ingestion of media files into the archive.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use mnema_core::{
    EmbeddingSpace, Error, EventBus, GeoPoint, ImageEmbedder, ItemKind, NewItem, Result,
    ServerEvent, TextEmbedder,
};
use mnema_crypto::CipherService;
use mnema_db::{hash_content, ItemStore};
use mnema_index::IndexManager;

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Imported and indexed under this item id.
    Imported(i64),
    /// Same content already in the catalog, under this item id.
    Duplicate(i64),
    /// Consent was withheld; nothing was stored.
    NoConsent,
    /// The file could not be ingested.
    Failed(String),
}

impl IngestOutcome {
    fn label(&self) -> &'static str {
        match self {
            IngestOutcome::Imported(_) => "imported",
            IngestOutcome::Duplicate(_) => "duplicate",
            IngestOutcome::NoConsent => "no_consent",
            IngestOutcome::Failed(_) => "error",
        }
    }
}

/// One file offered for ingestion, with its capture metadata.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub path: PathBuf,
    pub kind: ItemKind,
    /// Consent recorded at capture time. Withheld consent skips the
    /// import entirely.
    pub consent: bool,
    pub captured_at: DateTime<Utc>,
    pub position: Option<GeoPoint>,
    /// Plaintext transcript (voice note text, note body). Encrypted
    /// before it touches the catalog.
    pub transcript: Option<String>,
}

impl IngestRequest {
    pub fn photo(path: impl Into<PathBuf>, captured_at: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            kind: ItemKind::Photo,
            consent: true,
            captured_at,
            position: None,
            transcript: None,
        }
    }
}

/// Counters for one ingestion batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub imported: usize,
    pub duplicates: usize,
    pub no_consent: usize,
    pub failed: usize,
}

impl IngestStats {
    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Imported(_) => self.imported += 1,
            IngestOutcome::Duplicate(_) => self.duplicates += 1,
            IngestOutcome::NoConsent => self.no_consent += 1,
            IngestOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Imports files: dedup by content hash, encrypt at rest, embed, index.
pub struct Ingestor {
    items: ItemStore,
    cipher: Arc<CipherService>,
    indexes: Arc<IndexManager>,
    image_embedder: Arc<dyn ImageEmbedder>,
    text_embedder: Arc<dyn TextEmbedder>,
    bus: EventBus,
}

impl Ingestor {
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

    /// Ingest one file.
    ///
    /// Pipeline: consent gate, plaintext hash, duplicate check, catalog
    /// row, embeddings, then encrypt the file in place last. The hash is
    /// always of plaintext, so re-offering the same content after
    /// encryption still deduplicates.
    #[instrument(skip(self, request), fields(path = %request.path.display()))]
    pub async fn ingest_file(&self, request: &IngestRequest) -> Result<IngestOutcome> {
        if !request.consent {
            info!("consent withheld, skipping import");
            return Ok(IngestOutcome::NoConsent);
        }

        let raw = std::fs::read(&request.path)?;
        // Offering an already-sealed file is an operator mistake; hash it
        // by its plaintext so the duplicate check still holds.
        let plaintext = match self.cipher.probe(&raw) {
            mnema_crypto::Probe::Decrypted(inner) => inner,
            mnema_crypto::Probe::Invalid => raw,
        };

        let file_hash = hash_content(&plaintext);
        if let Some(existing) = self.items.get_by_hash(&file_hash).await? {
            return Ok(IngestOutcome::Duplicate(existing.id));
        }
        let path_str = request.path.to_string_lossy().into_owned();
        if let Some(existing) = self.items.get_by_path(&path_str).await? {
            return Ok(IngestOutcome::Duplicate(existing.id));
        }

        let encrypted_transcript = request
            .transcript
            .as_deref()
            .map(|t| self.cipher.encrypt_string(t))
            .transpose()
            .map_err(|e| Error::Crypto(e.to_string()))?;

        let item_id = self
            .items
            .create(&NewItem {
                file_path: path_str,
                file_hash,
                kind: request.kind,
                has_consent: true,
                is_rotated: false,
                created_at: request.captured_at,
                latitude: request.position.map(|p| p.latitude),
                longitude: request.position.map(|p| p.longitude),
                transcript: encrypted_transcript,
            })
            .await?;

        self.index_item(item_id, request, &plaintext).await?;

        self.cipher
            .encrypt_file_in_place(&request.path)
            .map_err(|e| Error::Crypto(e.to_string()))?;

        info!(item_id, "imported");
        Ok(IngestOutcome::Imported(item_id))
    }

    /// Compute and store embeddings for a new item. An embedder that has
    /// no vector for the input leaves that space unindexed.
    async fn index_item(&self, item_id: i64, request: &IngestRequest, plaintext: &[u8]) -> Result<()> {
        if request.kind == ItemKind::Photo {
            if let Some(vector) = self.image_embedder.embed_image(plaintext).await? {
                let internal = self
                    .indexes
                    .add_embedding(EmbeddingSpace::Image, item_id, &vector)
                    .await?;
                self.items
                    .set_index_id(item_id, EmbeddingSpace::Image, internal)
                    .await?;
            }
        }

        if let Some(transcript) = request.transcript.as_deref() {
            if let Some(vector) = self.text_embedder.embed_text(transcript).await? {
                let internal = self
                    .indexes
                    .add_embedding(EmbeddingSpace::Text, item_id, &vector)
                    .await?;
                self.items
                    .set_index_id(item_id, EmbeddingSpace::Text, internal)
                    .await?;
            }
        }
        Ok(())
    }

    /// Ingest a batch, reporting progress on the event bus.
    ///
    /// Per-file failures are counted and reported, never fatal to the
    /// batch. `cancel` is checked between files; a cancelled batch keeps
    /// everything imported so far.
    pub async fn ingest_batch(
        &self,
        requests: &[IngestRequest],
        cancel: &AtomicBool,
    ) -> Result<IngestStats> {
        let total_files = requests.len();
        self.bus.emit(ServerEvent::IngestStarted { total_files });

        let mut stats = IngestStats::default();
        let mut cancelled = false;

        for (processed, request) in requests.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            let outcome = match self.ingest_file(request).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(path = %request.path.display(), error = %e, "ingest failed");
                    IngestOutcome::Failed(e.to_string())
                }
            };
            stats.record(&outcome);

            self.bus.emit(ServerEvent::IngestProgress {
                processed: processed + 1,
                total_files,
                file_path: request.path.to_string_lossy().into_owned(),
                outcome: outcome.label().to_string(),
            });

            // Let queries interleave with a long batch.
            tokio::task::yield_now().await;
        }

        self.bus.emit(ServerEvent::IngestFinished {
            imported: stats.imported,
            duplicates: stats.duplicates,
            errors: stats.failed,
            cancelled,
        });
        info!(?stats, cancelled, "ingest batch finished");
        Ok(stats)
    }

    /// Build ingest requests for every regular file in a folder, kind
    /// inferred from the extension. Unrecognized extensions are skipped.
    pub fn scan_folder(dir: &Path, consent: bool) -> Result<Vec<IngestRequest>> {
        let mut requests = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(kind) = kind_for_extension(&path) else {
                continue;
            };

            let captured_at = entry
                .metadata()?
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            requests.push(IngestRequest {
                path,
                kind,
                consent,
                captured_at,
                position: None,
                transcript: None,
            });
        }
        requests.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(requests)
    }
}

fn kind_for_extension(path: &Path) -> Option<ItemKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "heic" | "webp" => Some(ItemKind::Photo),
        "wav" | "mp3" | "m4a" | "ogg" | "flac" => Some(ItemKind::Audio),
        "txt" | "md" => Some(ItemKind::Note),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnema_core::defaults::{IMAGE_EMBED_DIMENSION, TEXT_EMBED_DIMENSION};
    use mnema_core::traits::mock::{MockImageEmbedder, MockTextEmbedder};
    use mnema_crypto::{is_encrypted, MasterKey};
    use mnema_db::Database;
    use mnema_index::{HnswParams, IndexKind};
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        ingestor: Ingestor,
        items: ItemStore,
        cipher: Arc<CipherService>,
        image: Arc<MockImageEmbedder>,
        bus: EventBus,
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
        let bus = EventBus::new();

        let ingestor = Ingestor::new(
            items.clone(),
            cipher.clone(),
            indexes,
            image.clone(),
            text,
            bus.clone(),
        );
        Fixture { ingestor, items, cipher, image, bus, dir }
    }

    fn write_photo(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn axis_vec(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; IMAGE_EMBED_DIMENSION];
        v[axis] = 1.0;
        v
    }

    #[tokio::test]
    async fn test_import_encrypts_file_and_indexes() {
        let f = fixture().await;
        let path = write_photo(f.dir.path(), "a.jpg", b"jpeg bytes");
        f.image.insert_image(b"jpeg bytes".to_vec(), axis_vec(0));

        let request = IngestRequest::photo(&path, "2025-06-15T10:00:00Z".parse().unwrap());
        let outcome = f.ingestor.ingest_file(&request).await.unwrap();

        let IngestOutcome::Imported(id) = outcome else {
            panic!("expected import, got {outcome:?}");
        };

        // File is sealed on disk
        let on_disk = std::fs::read(&path).unwrap();
        assert!(is_encrypted(&on_disk));
        assert_eq!(f.cipher.decrypt_bytes(&on_disk).unwrap(), b"jpeg bytes");

        // Catalog row carries the plaintext hash and the index mapping
        let item = f.items.get(id).await.unwrap().unwrap();
        assert_eq!(item.file_hash, hash_content(b"jpeg bytes"));
        assert!(item.image_index_id.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_content_detected_across_paths() {
        let f = fixture().await;
        let first = write_photo(f.dir.path(), "a.jpg", b"same bytes");
        let second = write_photo(f.dir.path(), "b.jpg", b"same bytes");

        let captured = "2025-06-15T10:00:00Z".parse().unwrap();
        let outcome = f
            .ingestor
            .ingest_file(&IngestRequest::photo(&first, captured))
            .await
            .unwrap();
        let IngestOutcome::Imported(id) = outcome else { panic!() };

        let outcome = f
            .ingestor
            .ingest_file(&IngestRequest::photo(&second, captured))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Duplicate(id));
    }

    #[tokio::test]
    async fn test_no_consent_stores_nothing() {
        let f = fixture().await;
        let path = write_photo(f.dir.path(), "a.jpg", b"private");

        let mut request = IngestRequest::photo(&path, "2025-06-15T10:00:00Z".parse().unwrap());
        request.consent = false;

        let outcome = f.ingestor.ingest_file(&request).await.unwrap();
        assert_eq!(outcome, IngestOutcome::NoConsent);
        assert!(f.items.list_all().await.unwrap().is_empty());
        // File untouched, not encrypted
        assert_eq!(std::fs::read(&path).unwrap(), b"private");
    }

    #[tokio::test]
    async fn test_transcript_encrypted_in_catalog() {
        let f = fixture().await;
        let path = write_photo(f.dir.path(), "note.txt", b"note file");

        let mut request = IngestRequest::photo(&path, "2025-06-15T10:00:00Z".parse().unwrap());
        request.kind = ItemKind::Note;
        request.transcript = Some("met Ada at the harbor".to_string());

        let IngestOutcome::Imported(id) = f.ingestor.ingest_file(&request).await.unwrap() else {
            panic!()
        };

        let stored = f.items.get(id).await.unwrap().unwrap().transcript.unwrap();
        assert_ne!(stored, "met Ada at the harbor");
        assert_eq!(
            f.cipher.decrypt_string(&stored).unwrap(),
            "met Ada at the harbor"
        );
    }

    #[tokio::test]
    async fn test_batch_counts_and_events() {
        let f = fixture().await;
        let a = write_photo(f.dir.path(), "a.jpg", b"one");
        let b = write_photo(f.dir.path(), "b.jpg", b"one");
        let missing = f.dir.path().join("missing.jpg");

        let captured = "2025-06-15T10:00:00Z".parse().unwrap();
        let requests = vec![
            IngestRequest::photo(&a, captured),
            IngestRequest::photo(&b, captured),
            IngestRequest::photo(&missing, captured),
        ];

        let mut rx = f.bus.subscribe();
        let stats = f
            .ingestor
            .ingest_batch(&requests, &AtomicBool::new(false))
            .await
            .unwrap();

        assert_eq!(stats.imported, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.failed, 1);

        // Started + 3 progress + finished
        let mut labels = Vec::new();
        for _ in 0..5 {
            labels.push(rx.recv().await.unwrap().payload);
        }
        assert!(matches!(labels[0], ServerEvent::IngestStarted { total_files: 3 }));
        assert!(matches!(
            labels[4],
            ServerEvent::IngestFinished { imported: 1, cancelled: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_batch_cancellation_stops_early() {
        let f = fixture().await;
        let a = write_photo(f.dir.path(), "a.jpg", b"one");
        let captured = "2025-06-15T10:00:00Z".parse().unwrap();

        let cancel = AtomicBool::new(true);
        let stats = f
            .ingestor
            .ingest_batch(&[IngestRequest::photo(&a, captured)], &cancel)
            .await
            .unwrap();
        assert_eq!(stats, IngestStats::default());
    }

    #[tokio::test]
    async fn test_scan_folder_infers_kinds() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("b.WAV"), b"x").unwrap();
        std::fs::write(dir.path().join("c.md"), b"x").unwrap();
        std::fs::write(dir.path().join("skip.bin"), b"x").unwrap();

        let requests = Ingestor::scan_folder(dir.path(), true).unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].kind, ItemKind::Photo);
        assert_eq!(requests[1].kind, ItemKind::Audio);
        assert_eq!(requests[2].kind, ItemKind::Note);
    }
}
