//! Persisted vector indexes for the semantic search spaces.
//!
//! Two index kinds back the same [`VectorIndex`] surface: an exact
//! brute-force scan and an HNSW graph for large catalogs. Vectors are
//! L2-normalized on the way in, so squared L2 distance orders results
//! like cosine similarity and maps onto a `[0, 1]` relevance score.

pub mod flat;
pub mod hnsw;
pub mod index;
pub mod manager;

pub use index::{HnswParams, IndexKind, VectorIndex};
pub use manager::IndexManager;

/// Squared L2 distance between two equal-length vectors.
pub(crate) fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// L2-normalize a vector. `None` for zero-magnitude input.
pub fn l2_normalize(vector: &[f32]) -> Option<Vec<f32>> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return None;
    }
    Some(vector.iter().map(|x| x / norm).collect())
}

/// Map a squared L2 distance between unit vectors onto a `[0, 1]` score.
///
/// For unit vectors `d = 2 - 2 cos`, so `1 - d/2` recovers the cosine,
/// clamped at zero for vectors pointing away from the query.
pub fn distance_to_score(distance: f32) -> f32 {
    (1.0 - distance / 2.0).max(0.0)
}
