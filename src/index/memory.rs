//! In-memory vector index implementation.
//!
//! Useful for testing and for catalogs that are rebuilt on every start.

use super::{check_dimensions, cosine_similarity, rank_hits, IndexEntry, SearchHit, VectorIndex};
use crate::embedding::EmbeddingSignature;
use crate::error::{AnirecError, Result};
use async_trait::async_trait;
use std::sync::RwLock;

#[derive(Default)]
struct Contents {
    signature: Option<EmbeddingSignature>,
    entries: Vec<IndexEntry>,
}

/// In-memory vector index.
#[derive(Default)]
pub struct MemoryVectorIndex {
    contents: RwLock<Contents>,
}

impl MemoryVectorIndex {
    /// Create an empty in-memory index.
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> AnirecError {
        AnirecError::VectorIndex(format!("Failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn build(&self, signature: &EmbeddingSignature, entries: &[IndexEntry]) -> Result<usize> {
        check_dimensions(signature, entries)?;

        let mut contents = self.contents.write().map_err(Self::poisoned)?;
        contents.signature = Some(signature.clone());
        contents.entries = entries.to_vec();
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let contents = self.contents.read().map_err(Self::poisoned)?;

        if let Some(signature) = &contents.signature {
            if signature.dimensions != query_embedding.len() {
                return Err(AnirecError::retrieval_failed(format!(
                    "Query has {} dimensions but the index stores {}",
                    query_embedding.len(),
                    signature.dimensions
                )));
            }
        }

        let hits = contents
            .entries
            .iter()
            .map(|entry| SearchHit {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        Ok(rank_hits(hits, limit))
    }

    async fn entry_count(&self) -> Result<usize> {
        let contents = self.contents.read().map_err(Self::poisoned)?;
        Ok(contents.entries.len())
    }

    async fn signature(&self) -> Result<Option<EmbeddingSignature>> {
        let contents = self.contents.read().map_err(Self::poisoned)?;
        Ok(contents.signature.clone())
    }
}
