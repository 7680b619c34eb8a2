//! Vector index abstraction for Anirec.
//!
//! Provides a trait-based interface over the persisted chunk index, plus the
//! builder that produces it.

pub mod builder;
mod memory;
mod sqlite;

pub use builder::{BuildReport, IndexBuilder};
pub use memory::MemoryVectorIndex;
pub use sqlite::{SqliteVectorIndex, INDEX_FILE_NAME};

use crate::chunking::Chunk;
use crate::embedding::EmbeddingSignature;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chunk stored in the index together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// The indexed chunk; carries its source record and order.
    pub chunk: Chunk,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }
}

/// A search hit with score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector index implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Replace the whole index with `entries`, all or nothing.
    async fn build(&self, signature: &EmbeddingSignature, entries: &[IndexEntry]) -> Result<usize>;

    /// The `limit` most similar entries, best first.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>>;

    /// Number of stored entries.
    async fn entry_count(&self) -> Result<usize>;

    /// Signature of the embedder the index was built with, if built.
    async fn signature(&self) -> Result<Option<EmbeddingSignature>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Keep the `limit` best hits. The sort is stable, so equal scores keep
/// insertion order.
pub(crate) fn rank_hits(mut hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    hits
}

/// Reject entries whose vectors do not match the declared signature.
pub(crate) fn check_dimensions(
    signature: &EmbeddingSignature,
    entries: &[IndexEntry],
) -> Result<()> {
    if let Some(bad) = entries
        .iter()
        .find(|e| e.embedding.len() != signature.dimensions)
    {
        return Err(crate::error::AnirecError::VectorIndex(format!(
            "Entry for record {} chunk {} has {} dimensions, index expects {}",
            bad.chunk.record_index,
            bad.chunk.order,
            bad.embedding.len(),
            signature.dimensions
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(record_index: usize, score: f32) -> SearchHit {
        SearchHit {
            chunk: Chunk {
                record_index,
                order: 0,
                content: String::new(),
            },
            score,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_hits_is_stable_on_ties() {
        let ranked = rank_hits(vec![hit(0, 0.5), hit(1, 0.9), hit(2, 0.5), hit(3, 0.1)], 3);
        let order: Vec<usize> = ranked.iter().map(|h| h.chunk.record_index).collect();
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn test_check_dimensions() {
        let signature = EmbeddingSignature::new("m", 2);
        let entry = IndexEntry::new(hit(4, 0.0).chunk, vec![1.0, 2.0, 3.0]);
        assert!(check_dimensions(&signature, &[entry]).is_err());
    }
}
