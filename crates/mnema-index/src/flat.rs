//! Exact brute-force index.
//!
//! Scans every stored vector on each query. Exact by construction and
//! the right default below a few hundred thousand vectors.

use serde::{Deserialize, Serialize};

use crate::squared_l2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: usize,
    // Row-major, one vector per `dim` floats.
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector, returning its internal id. The caller has
    /// already validated the dimension.
    pub fn add(&mut self, vector: &[f32]) -> u32 {
        debug_assert_eq!(vector.len(), self.dim);
        let id = self.len() as u32;
        self.data.extend_from_slice(vector);
        id
    }

    fn vector(&self, id: usize) -> &[f32] {
        &self.data[id * self.dim..(id + 1) * self.dim]
    }

    /// The `k` nearest vectors by squared L2 distance, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(u32, f32)> {
        let mut hits: Vec<(u32, f32)> = (0..self.len())
            .map(|id| (id as u32, squared_l2(query, self.vector(id))))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.truncate(k);
        hits
    }
}
