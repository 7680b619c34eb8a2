//! Embedding generation for indexing and retrieval.

mod hashing;
mod openai;

pub use hashing::HashingEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{Credentials, EmbeddingProvider, EmbeddingSettings};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity of an embedding function.
///
/// An index is only meaningful when queried with vectors from the same
/// function that built it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSignature {
    /// Model (or algorithm) name.
    pub model: String,
    /// Vector length.
    pub dimensions: usize,
}

impl EmbeddingSignature {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }
}

impl std::fmt::Display for EmbeddingSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} dims)", self.model, self.dimensions)
    }
}

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Identity of this embedding function.
    fn signature(&self) -> EmbeddingSignature;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize {
        self.signature().dimensions
    }
}

/// Create the embedder selected by the settings.
pub fn create_embedder(
    settings: &EmbeddingSettings,
    credentials: &Credentials,
) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedder::from_settings(
            settings,
            credentials.embedding_api_key.as_deref(),
        )?),
        EmbeddingProvider::Hashing => {
            Arc::new(HashingEmbedder::new(settings.dimensions as usize))
        }
    };
    Ok(embedder)
}
