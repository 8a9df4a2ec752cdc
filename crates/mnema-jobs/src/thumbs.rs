//! Consent-gated thumbnail service with an in-process LRU cache.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::debug;

use mnema_core::defaults::{THUMBNAIL_CACHE_SIZE, THUMBNAIL_EDGE};
use mnema_core::{Error, Result, ThumbnailRenderer};
use mnema_crypto::CipherService;
use mnema_db::ItemStore;
use mnema_privacy::ConsentGuard;

/// Serves rendered thumbnails.
///
/// The consent check runs on *every* request, before the cache lookup.
/// A cached thumbnail for a since-revoked item is therefore unreachable,
/// and [`invalidate`](Self::invalidate) drops it outright on revocation
/// or deletion.
pub struct ThumbnailService {
    items: ItemStore,
    guard: ConsentGuard,
    cipher: Arc<CipherService>,
    renderer: Arc<dyn ThumbnailRenderer>,
    cache: Mutex<LruCache<i64, Arc<Vec<u8>>>>,
    edge: u32,
}

impl ThumbnailService {
    pub fn new(
        items: ItemStore,
        guard: ConsentGuard,
        cipher: Arc<CipherService>,
        renderer: Arc<dyn ThumbnailRenderer>,
    ) -> Self {
        Self::with_capacity(items, guard, cipher, renderer, THUMBNAIL_CACHE_SIZE)
    }

    pub fn with_capacity(
        items: ItemStore,
        guard: ConsentGuard,
        cipher: Arc<CipherService>,
        renderer: Arc<dyn ThumbnailRenderer>,
        capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            items,
            guard,
            cipher,
            renderer,
            cache: Mutex::new(LruCache::new(capacity)),
            edge: THUMBNAIL_EDGE,
        }
    }

    /// Render (or serve from cache) the thumbnail of an item.
    pub async fn thumbnail(&self, item_id: i64) -> Result<Arc<Vec<u8>>> {
        self.guard.check_consent(item_id, "thumbnail").await?;

        if let Some(cached) = self.lock_cache()?.get(&item_id).cloned() {
            debug!(item_id, "thumbnail cache hit");
            return Ok(cached);
        }

        let item = self
            .items
            .get(item_id)
            .await?
            .ok_or(Error::ItemNotFound(item_id))?;
        let plaintext = self
            .cipher
            .decrypt_file(Path::new(&item.file_path))
            .map_err(|e| Error::Decryption(e.to_string()))?;
        let rendered = Arc::new(self.renderer.render(&plaintext, self.edge)?);

        self.lock_cache()?.put(item_id, rendered.clone());
        debug!(item_id, bytes = rendered.len(), "thumbnail rendered");
        Ok(rendered)
    }

    /// Drop a cached thumbnail, e.g. on revocation or deletion.
    pub fn invalidate(&self, item_id: i64) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(&item_id);
        }
    }

    /// Number of cached thumbnails.
    pub fn cached(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn lock_cache(&self) -> Result<std::sync::MutexGuard<'_, LruCache<i64, Arc<Vec<u8>>>>> {
        self.cache
            .lock()
            .map_err(|_| Error::Internal("thumbnail cache lock poisoned".to_string()))
    }
}
