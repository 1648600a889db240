//! Exact brute-force L2 nearest-neighbour index.
//!
//! The index is a snapshot of the vectors it was built from. It keeps a
//! fingerprint of those vectors so a loaded index can be checked against the
//! store it claims to cover.

use std::cmp::Ordering;

use thesis_core::types::Neighbor;
use thesis_core::{Error, Result};

use crate::store::EmbeddingStore;

#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dim: usize,
    data: Vec<f32>,
    len: usize,
    fingerprint: String,
}

impl FlatL2Index {
    /// Build over `vectors`; every vector must have length `dim`.
    pub fn build(vectors: &[Vec<f32>], dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidInput("index dim must be > 0".into()));
        }
        let mut data = Vec::with_capacity(vectors.len() * dim);
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(Error::InvalidInput(format!("vector {i} has dim {} expected {dim}", v.len())));
            }
            data.extend_from_slice(v);
        }
        Ok(Self { dim, data, len: vectors.len(), fingerprint: fingerprint(vectors) })
    }

    pub fn from_store(store: &EmbeddingStore) -> Result<Self> {
        Self::build(store.vectors(), store.dim())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Fingerprint of the vectors this index was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn vector(&self, i: usize) -> Option<&[f32]> {
        (i < self.len).then(|| &self.data[i * self.dim..(i + 1) * self.dim])
    }

    /// The `k` nearest vectors by ascending squared L2 distance, ties broken by
    /// lower index. Returns all `len()` neighbours when `k` exceeds it.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(Error::InvalidInput(format!("query has dim {} expected {}", query.len(), self.dim)));
        }
        if k == 0 || self.len == 0 {
            return Ok(Vec::new());
        }
        let mut all: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(index, v)| Neighbor { index, distance: squared_l2(query, v) })
            .collect();
        if k < all.len() {
            all.select_nth_unstable_by(k - 1, by_distance);
            all.truncate(k);
        }
        all.sort_by(by_distance);
        Ok(all)
    }

    /// Same as [`search`](Self::search) split into parallel `(distances, indices)`.
    pub fn search_raw(&self, query: &[f32], k: usize) -> Result<(Vec<f32>, Vec<usize>)> {
        Ok(self.search(query, k)?.into_iter().map(|n| (n.distance, n.index)).unzip())
    }
}

fn by_distance(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance.total_cmp(&b.distance).then(a.index.cmp(&b.index))
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// blake3 over the count, dimension and little-endian bytes of every vector.
pub fn fingerprint(vectors: &[Vec<f32>]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(vectors.len() as u64).to_le_bytes());
    for v in vectors {
        hasher.update(&(v.len() as u64).to_le_bytes());
        for x in v {
            hasher.update(&x.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
