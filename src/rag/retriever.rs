//! Similarity retrieval over a persisted index.

use crate::embedding::Embedder;
use crate::error::{AnirecError, Result};
use crate::index::{SearchHit, SqliteVectorIndex, VectorIndex};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Default number of chunks fed to the prompt.
pub const DEFAULT_TOP_K: usize = 4;

/// Embeds queries and looks them up in a vector index.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    /// Pair an index with the embedder that must have built it.
    ///
    /// Fails when the index is empty or was built by a different embedding
    /// function.
    pub async fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let count = index.entry_count().await?;
        if count == 0 {
            return Err(AnirecError::retrieval_failed("Index contains no entries"));
        }

        let query_signature = embedder.signature();
        match index.signature().await? {
            Some(built) if built != query_signature => {
                return Err(AnirecError::SignatureMismatch {
                    built: built.to_string(),
                    query: query_signature.to_string(),
                });
            }
            Some(_) => {}
            None => {
                return Err(AnirecError::retrieval_failed(
                    "Index has no embedding metadata",
                ));
            }
        }

        debug!("Retriever ready over {} entries ({})", count, query_signature);

        Ok(Self {
            index,
            embedder,
            top_k: DEFAULT_TOP_K,
        })
    }

    /// Open the persisted index in `location` for querying.
    ///
    /// A location with no index, or with an index holding no entries, is
    /// reported as not found.
    #[instrument(skip(embedder), fields(location = %location.display()))]
    pub async fn open(location: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let index = SqliteVectorIndex::open_in(location)?;
        if index.entry_count().await? == 0 {
            return Err(AnirecError::IndexNotFound(location.to_path_buf()));
        }
        let retriever = Self::new(Arc::new(index), embedder).await?;
        info!("Opened index at {}", location.display());
        Ok(retriever)
    }

    /// Set how many chunks [`Retriever::retrieve`] returns.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Top-k chunks for `query` using the configured k.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.search(query, self.top_k).await
    }

    /// The `k` chunks most similar to `query`, best first.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| AnirecError::retrieval("failed to embed query", e))?;

        let hits = match self.index.search(&query_embedding, k).await {
            Ok(hits) => hits,
            Err(e @ AnirecError::Retrieval { .. }) => return Err(e),
            Err(e) => return Err(AnirecError::retrieval("index search failed", e)),
        };
        debug!("Retrieved {} chunks", hits.len());
        Ok(hits)
    }
}
