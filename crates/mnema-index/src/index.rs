//! A persisted vector index with stable item-id mapping.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mnema_core::{Error, Result};

use crate::flat::FlatIndex;
use crate::hnsw::HnswIndex;
use crate::{distance_to_score, l2_normalize};

/// Which algorithm backs an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exact brute-force scan.
    Flat,
    /// Approximate graph search, for large catalogs.
    Hnsw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Backend {
    Flat(FlatIndex),
    Hnsw { graph: HnswIndex, ef_search: usize },
}

impl Backend {
    fn add(&mut self, vector: &[f32]) -> u32 {
        match self {
            Backend::Flat(index) => index.add(vector),
            Backend::Hnsw { graph, .. } => graph.add(vector),
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(u32, f32)> {
        match self {
            Backend::Flat(index) => index.search(query, k),
            Backend::Hnsw { graph, ef_search } => graph.search(query, k, *ef_search),
        }
    }

    fn len(&self) -> usize {
        match self {
            Backend::Flat(index) => index.len(),
            Backend::Hnsw { graph, .. } => graph.len(),
        }
    }
}

/// On-disk payload of the `.index` file.
#[derive(Serialize, Deserialize)]
struct IndexFile {
    dim: usize,
    backend: Backend,
}

/// Tuning knobs for the HNSW backend.
#[derive(Debug, Clone, Copy)]
pub struct HnswParams {
    pub neighbors: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            neighbors: mnema_core::defaults::HNSW_NEIGHBORS,
            ef_construction: mnema_core::defaults::HNSW_EF_CONSTRUCTION,
            ef_search: mnema_core::defaults::HNSW_EF_SEARCH,
        }
    }
}

/// A vector index paired with its catalog-id mapping, persisted as
/// `<name>.index` and `<name>.idmap` in one directory.
///
/// Internal ids are append-only; removing an item tombstones its slot in
/// the mapping rather than renumbering live vectors, so the ids stored
/// in the catalog stay valid for the index lifetime.
#[derive(Debug)]
pub struct VectorIndex {
    name: String,
    dim: usize,
    dir: PathBuf,
    backend: Backend,
    // internal id -> item id, None once tombstoned
    id_map: Vec<Option<i64>>,
}

impl VectorIndex {
    /// Open an index from `dir`, or start a fresh one.
    ///
    /// Unreadable or corrupt files are logged and replaced by an empty
    /// index; losing an index costs a reindex, not the archive.
    pub fn open(dir: &Path, name: &str, dim: usize, kind: IndexKind, params: HnswParams) -> Self {
        let fresh_backend = || match kind {
            IndexKind::Flat => Backend::Flat(FlatIndex::new(dim)),
            IndexKind::Hnsw => Backend::Hnsw {
                graph: HnswIndex::new(dim, params.neighbors, params.ef_construction),
                ef_search: params.ef_search,
            },
        };

        let index_path = dir.join(format!("{name}.index"));
        let idmap_path = dir.join(format!("{name}.idmap"));

        let loaded = Self::load_files(&index_path, &idmap_path, dim, kind);
        let (backend, id_map) = match loaded {
            Ok(Some(pair)) => {
                info!(name, size = pair.0.len(), "loaded vector index");
                pair
            }
            Ok(None) => {
                debug!(name, "no persisted index, starting empty");
                (fresh_backend(), Vec::new())
            }
            Err(e) => {
                warn!(name, error = %e, "failed to load vector index, starting empty");
                (fresh_backend(), Vec::new())
            }
        };

        Self {
            name: name.to_string(),
            dim,
            dir: dir.to_path_buf(),
            backend,
            id_map,
        }
    }

    /// Start an empty index in `dir`, ignoring any persisted files, and
    /// persist the empty state immediately. Used for rebuilds.
    pub fn open_fresh(
        dir: &Path,
        name: &str,
        dim: usize,
        kind: IndexKind,
        params: HnswParams,
    ) -> Result<Self> {
        let backend = match kind {
            IndexKind::Flat => Backend::Flat(FlatIndex::new(dim)),
            IndexKind::Hnsw => Backend::Hnsw {
                graph: HnswIndex::new(dim, params.neighbors, params.ef_construction),
                ef_search: params.ef_search,
            },
        };
        let index = Self {
            name: name.to_string(),
            dim,
            dir: dir.to_path_buf(),
            backend,
            id_map: Vec::new(),
        };
        index.persist()?;
        Ok(index)
    }

    fn load_files(
        index_path: &Path,
        idmap_path: &Path,
        dim: usize,
        kind: IndexKind,
    ) -> Result<Option<(Backend, Vec<Option<i64>>)>> {
        if !index_path.exists() && !idmap_path.exists() {
            return Ok(None);
        }

        let index_bytes = std::fs::read(index_path)?;
        let idmap_bytes = std::fs::read(idmap_path)?;

        let file: IndexFile = bincode::deserialize(&index_bytes)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let id_map: Vec<Option<i64>> = bincode::deserialize(&idmap_bytes)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        if file.dim != dim {
            return Err(Error::Index(format!(
                "dimension mismatch: file has {}, expected {}",
                file.dim, dim
            )));
        }
        let file_kind = match &file.backend {
            Backend::Flat(_) => IndexKind::Flat,
            Backend::Hnsw { .. } => IndexKind::Hnsw,
        };
        if file_kind != kind {
            return Err(Error::Index(format!(
                "kind mismatch: file is {:?}, expected {:?}",
                file_kind, kind
            )));
        }
        if file.backend.len() != id_map.len() {
            return Err(Error::Index(format!(
                "index has {} vectors but id map has {} entries",
                file.backend.len(),
                id_map.len()
            )));
        }

        Ok(Some((file.backend, id_map)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Number of live (non-tombstoned) vectors.
    pub fn len(&self) -> usize {
        self.id_map.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total stored slots, tombstoned entries included. This is the next
    /// internal id to be assigned.
    pub fn size(&self) -> usize {
        self.id_map.len()
    }

    /// Add an embedding for an item, returning its internal id.
    ///
    /// The vector is L2-normalized before storage so squared L2 distance
    /// tracks cosine similarity. Both files are rewritten immediately.
    pub fn add_embedding(&mut self, item_id: i64, vector: &[f32]) -> Result<i64> {
        if vector.len() != self.dim {
            return Err(Error::InvalidInput(format!(
                "embedding has dimension {}, index {} expects {}",
                vector.len(),
                self.name,
                self.dim
            )));
        }
        let normalized = l2_normalize(vector).ok_or_else(|| {
            Error::InvalidInput("cannot index a zero-magnitude embedding".to_string())
        })?;

        let internal = self.backend.add(&normalized);
        self.id_map.push(Some(item_id));
        debug_assert_eq!(internal as usize, self.id_map.len() - 1);

        self.persist()?;
        debug!(name = %self.name, item_id, internal_id = internal, "added embedding");
        Ok(internal as i64)
    }

    /// Add a batch of embeddings, persisting once at the end. Internal
    /// ids are contiguous in input order.
    pub fn add_embeddings(&mut self, entries: &[(i64, Vec<f32>)]) -> Result<Vec<i64>> {
        let mut internal_ids = Vec::with_capacity(entries.len());
        for (item_id, vector) in entries {
            if vector.len() != self.dim {
                return Err(Error::InvalidInput(format!(
                    "embedding has dimension {}, index {} expects {}",
                    vector.len(),
                    self.name,
                    self.dim
                )));
            }
            let normalized = l2_normalize(vector).ok_or_else(|| {
                Error::InvalidInput("cannot index a zero-magnitude embedding".to_string())
            })?;
            let internal = self.backend.add(&normalized);
            self.id_map.push(Some(*item_id));
            internal_ids.push(internal as i64);
        }
        if !internal_ids.is_empty() {
            self.persist()?;
        }
        Ok(internal_ids)
    }

    /// The `k` nearest live items, as `(item_id, score)` with scores in
    /// `[0, 1]`, best first. Tombstoned slots never surface.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(i64, f32)>> {
        if query.len() != self.dim {
            return Err(Error::InvalidInput(format!(
                "query has dimension {}, index {} expects {}",
                query.len(),
                self.name,
                self.dim
            )));
        }
        let Some(normalized) = l2_normalize(query) else {
            return Ok(Vec::new());
        };

        // Overfetch by the tombstone count so deletions cannot starve k.
        let dead = self.id_map.len() - self.len();
        let hits = self.backend.search(&normalized, k + dead);

        Ok(hits
            .into_iter()
            .filter_map(|(internal, dist)| {
                self.id_map[internal as usize].map(|item_id| (item_id, distance_to_score(dist)))
            })
            .take(k)
            .collect())
    }

    /// Tombstone every slot mapped to an item. Returns how many slots
    /// were cleared.
    pub fn remove_item(&mut self, item_id: i64) -> Result<usize> {
        let mut cleared = 0;
        for slot in &mut self.id_map {
            if *slot == Some(item_id) {
                *slot = None;
                cleared += 1;
            }
        }
        if cleared > 0 {
            self.persist()?;
            debug!(name = %self.name, item_id, cleared, "tombstoned embedding");
        }
        Ok(cleared)
    }

    /// Rewrite both files, temp-then-rename so a crash mid-write leaves
    /// the previous pair intact.
    pub fn persist(&self) -> Result<()> {
        let file = IndexFile {
            dim: self.dim,
            backend: self.backend.clone(),
        };
        let index_bytes =
            bincode::serialize(&file).map_err(|e| Error::Serialization(e.to_string()))?;
        let idmap_bytes =
            bincode::serialize(&self.id_map).map_err(|e| Error::Serialization(e.to_string()))?;

        write_atomic(&self.dir.join(format!("{}.index", self.name)), &index_bytes)?;
        write_atomic(&self.dir.join(format!("{}.idmap", self.name)), &idmap_bytes)?;
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
