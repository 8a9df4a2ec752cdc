//! Hierarchical navigable small-world graph.
//!
//! Approximate nearest-neighbor search over squared L2 distance. The
//! whole graph, vectors included, serializes with serde so an index
//! survives restarts as a single bincode blob.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::squared_l2;

/// A candidate ordered by distance. `BinaryHeap` is a max-heap, so the
/// plain ordering gives a worst-first heap and `Reverse` a best-first one.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    dist: f32,
    id: u32,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dist.total_cmp(&other.dist).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    vector: Vec<f32>,
    // One adjacency list per level the node participates in;
    // `neighbors.len() - 1` is the node's top level.
    neighbors: Vec<Vec<u32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswIndex {
    dim: usize,
    /// Maximum links per node on upper levels. Level 0 allows `2 * m`.
    m: usize,
    ef_construction: usize,
    /// Level sampling factor, `1 / ln(m)`.
    level_mult: f64,
    entry: Option<u32>,
    nodes: Vec<Node>,
}

impl HnswIndex {
    pub fn new(dim: usize, m: usize, ef_construction: usize) -> Self {
        Self {
            dim,
            m,
            ef_construction,
            level_mult: 1.0 / (m as f64).ln(),
            entry: None,
            nodes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn max_links(&self, level: usize) -> usize {
        if level == 0 {
            self.m * 2
        } else {
            self.m
        }
    }

    fn random_level(&self) -> usize {
        let uniform: f64 = rand::thread_rng().gen_range(f64::MIN_POSITIVE..1.0);
        (-uniform.ln() * self.level_mult).floor() as usize
    }

    fn distance(&self, id: u32, query: &[f32]) -> f32 {
        squared_l2(&self.nodes[id as usize].vector, query)
    }

    /// Greedy descent on one level: hop to the closest neighbor until no
    /// neighbor improves on the current node.
    fn greedy_step(&self, query: &[f32], mut current: u32, level: usize) -> u32 {
        let mut best = self.distance(current, query);
        loop {
            let mut improved = false;
            for &neighbor in &self.nodes[current as usize].neighbors[level] {
                let d = self.distance(neighbor, query);
                if d < best {
                    best = d;
                    current = neighbor;
                    improved = true;
                }
            }
            if !improved {
                return current;
            }
        }
    }

    /// Beam search on one level, keeping the `ef` closest nodes seen.
    fn search_layer(&self, query: &[f32], entry: u32, ef: usize, level: usize) -> Vec<Candidate> {
        let entry_dist = self.distance(entry, query);

        let mut visited: HashSet<u32> = HashSet::from([entry]);
        let mut frontier = BinaryHeap::from([Reverse(Candidate { dist: entry_dist, id: entry })]);
        let mut found = BinaryHeap::from([Candidate { dist: entry_dist, id: entry }]);

        while let Some(Reverse(candidate)) = frontier.pop() {
            let worst = found.peek().map(|c| c.dist).unwrap_or(f32::INFINITY);
            if candidate.dist > worst && found.len() >= ef {
                break;
            }

            for &neighbor in &self.nodes[candidate.id as usize].neighbors[level] {
                if !visited.insert(neighbor) {
                    continue;
                }
                let d = self.distance(neighbor, query);
                let worst = found.peek().map(|c| c.dist).unwrap_or(f32::INFINITY);
                if found.len() < ef || d < worst {
                    frontier.push(Reverse(Candidate { dist: d, id: neighbor }));
                    found.push(Candidate { dist: d, id: neighbor });
                    if found.len() > ef {
                        found.pop();
                    }
                }
            }
        }

        found.into_sorted_vec()
    }

    /// Trim an adjacency list back to the level's link budget, keeping
    /// the closest neighbors.
    fn prune(&mut self, id: u32, level: usize) {
        let cap = self.max_links(level);
        if self.nodes[id as usize].neighbors[level].len() <= cap {
            return;
        }
        let base = self.nodes[id as usize].vector.clone();
        let mut links: Vec<Candidate> = self.nodes[id as usize].neighbors[level]
            .iter()
            .map(|&n| Candidate { dist: squared_l2(&base, &self.nodes[n as usize].vector), id: n })
            .collect();
        links.sort();
        self.nodes[id as usize].neighbors[level] =
            links.into_iter().take(cap).map(|c| c.id).collect();
    }

    /// Insert a vector, returning its internal id.
    pub fn add(&mut self, vector: &[f32]) -> u32 {
        debug_assert_eq!(vector.len(), self.dim);

        let id = self.nodes.len() as u32;
        let level = self.random_level();
        self.nodes.push(Node {
            vector: vector.to_vec(),
            neighbors: vec![Vec::new(); level + 1],
        });

        let Some(entry) = self.entry else {
            self.entry = Some(id);
            return id;
        };

        let top = self.nodes[entry as usize].neighbors.len() - 1;
        let mut current = entry;

        // Descend through levels above the new node's top level.
        for l in ((level + 1)..=top).rev() {
            current = self.greedy_step(vector, current, l);
        }

        // Link on every shared level, closest candidates first.
        for l in (0..=level.min(top)).rev() {
            let candidates = self.search_layer(vector, current, self.ef_construction, l);
            current = candidates[0].id;

            let links: Vec<u32> = candidates
                .iter()
                .take(self.max_links(l))
                .map(|c| c.id)
                .collect();
            for &neighbor in &links {
                self.nodes[neighbor as usize].neighbors[l].push(id);
                self.prune(neighbor, l);
            }
            self.nodes[id as usize].neighbors[l] = links;
        }

        if level > top {
            self.entry = Some(id);
        }
        id
    }

    /// The `k` approximate nearest vectors, closest first.
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<(u32, f32)> {
        let Some(entry) = self.entry else {
            return Vec::new();
        };

        let top = self.nodes[entry as usize].neighbors.len() - 1;
        let mut current = entry;
        for l in (1..=top).rev() {
            current = self.greedy_step(query, current, l);
        }

        self.search_layer(query, current, ef_search.max(k), 0)
            .into_iter()
            .take(k)
            .map(|c| (c.id, c.dist))
            .collect()
    }
}
