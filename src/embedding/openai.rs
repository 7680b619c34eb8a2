//! OpenAI-compatible embeddings implementation.
//!
//! Works against OpenAI itself or any server exposing `/embeddings` in the
//! same shape, such as a local Ollama serving `all-minilm`.

use super::{Embedder, EmbeddingSignature};
use crate::config::EmbeddingSettings;
use crate::error::{AnirecError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Embedder backed by an OpenAI-compatible embeddings endpoint.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder from settings.
    pub fn from_settings(settings: &EmbeddingSettings, api_key: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: create_client(&settings.base_url, api_key)?,
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
            batch_size: settings.batch_size.max(1),
        })
    }

    /// Only OpenAI's v3 models accept a requested output size.
    fn supports_dimensions_param(&self) -> bool {
        self.model.starts_with("text-embedding-3")
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AnirecError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let mut args = CreateEmbeddingRequestArgs::default();
            args.model(&self.model)
                .input(EmbeddingInput::StringArray(batch.to_vec()));
            if self.supports_dimensions_param() {
                args.dimensions(self.dimensions as u32);
            }
            let request = args
                .build()
                .map_err(|e| AnirecError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self.client.embeddings().create(request).await.map_err(|e| {
                AnirecError::Embedding(format!("Embedding API error: {}", e))
            })?;

            if response.data.len() != batch.len() {
                return Err(AnirecError::Embedding(format!(
                    "Requested {} embeddings but received {}",
                    batch.len(),
                    response.data.len()
                )));
            }

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            for embedding_data in embeddings {
                if embedding_data.embedding.len() != self.dimensions {
                    return Err(AnirecError::Embedding(format!(
                        "Model {} returned {} dimensions, expected {}",
                        self.model,
                        embedding_data.embedding.len(),
                        self.dimensions
                    )));
                }
                all_embeddings.push(embedding_data.embedding);
            }
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn signature(&self) -> EmbeddingSignature {
        EmbeddingSignature::new(&self.model, self.dimensions)
    }
}
