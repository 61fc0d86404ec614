//! In-memory candidate store, used for tests and local development.

use async_trait::async_trait;
use parking_lot::RwLock;

use flatmatch_core::{CandidateStore, Listing, Result};

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<(Listing, Vec<f32>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listing: Listing, embedding: Vec<f32>) {
        self.entries.write().push((listing, embedding));
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<Listing>> {
        let entries = self.entries.read();
        let mut scored: Vec<(f32, &Listing)> = entries
            .iter()
            .map(|(listing, vec)| (cosine_similarity(embedding, vec), listing))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, listing)| listing.clone())
            .collect())
    }
}

/// Mismatched dimensions and zero-norm vectors both score 0.0 rather
/// than erroring.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
