//! Index construction: chunk, embed, persist.
//!
//! A build either publishes a complete index or leaves the target directory
//! exactly as it was. Entries are written to a staging file next to the live
//! index and renamed over it only after the write has committed, so readers
//! never observe a half-written index.

use super::{IndexEntry, SqliteVectorIndex, VectorIndex, INDEX_FILE_NAME};
use crate::chunking::{chunk_records, Chunk, ChunkingConfig};
use crate::embedding::Embedder;
use crate::error::{AnirecError, Result};
use crate::ingest::CanonicalRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Summary of a finished build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Canonical records indexed.
    pub records: usize,
    /// Chunks embedded and stored.
    pub chunks: usize,
    /// Embedding dimensions.
    pub dimensions: usize,
    /// Location of the published index file.
    pub index_path: PathBuf,
}

/// Builds a persisted vector index from canonical records.
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
}

impl IndexBuilder {
    /// Create a builder using the given embedder and chunking policy.
    pub fn new(embedder: Arc<dyn Embedder>, chunking: ChunkingConfig) -> Self {
        Self { embedder, chunking }
    }

    /// Chunk, embed and persist `records` into `persist_dir`.
    ///
    /// Rerunning against the same directory replaces the previous index.
    #[instrument(skip(self, records), fields(records = records.len(), dir = %persist_dir.display()))]
    pub async fn build(&self, records: &[CanonicalRecord], persist_dir: &Path) -> Result<BuildReport> {
        let entries = self.build_entries(records).await.inspect_err(|e| {
            error!("Failed to prepare index entries: {}", e);
        })?;

        let index_path = self.persist(&entries, persist_dir).await.inspect_err(|e| {
            error!("Failed to persist index: {}", e);
        })?;

        Ok(BuildReport {
            records: records.len(),
            chunks: entries.len(),
            dimensions: self.embedder.dimensions(),
            index_path,
        })
    }

    /// Chunk and embed `records` without persisting anything.
    pub async fn build_entries(&self, records: &[CanonicalRecord]) -> Result<Vec<IndexEntry>> {
        if records.is_empty() {
            return Err(AnirecError::build(
                "no canonical records to index",
                AnirecError::InvalidInput("catalog is empty".to_string()),
            ));
        }

        let chunks = chunk_records(records, &self.chunking);
        info!("Embedding {} chunks from {} records", chunks.len(), records.len());

        self.embed_chunks(chunks)
            .await
            .map_err(|e| AnirecError::build("embedding chunks failed", e))
    }

    /// Embed chunks in one batched pass. Any failure fails the whole pass.
    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<IndexEntry>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(AnirecError::Embedding(format!(
                "Embedded {} of {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry::new(chunk, embedding))
            .collect())
    }

    /// Write `entries` into `persist_dir`, replacing any existing index.
    pub async fn persist(&self, entries: &[IndexEntry], persist_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(persist_dir)
            .map_err(|e| AnirecError::build("creating index directory failed", e.into()))?;

        let final_path = persist_dir.join(INDEX_FILE_NAME);
        let staging_path = persist_dir.join(format!(".{}.{}.partial", INDEX_FILE_NAME, Uuid::new_v4()));

        let signature = self.embedder.signature();
        let written = async {
            let index = SqliteVectorIndex::create(&staging_path)?;
            index.build(&signature, entries).await
        }
        .await;

        if let Err(e) = written {
            if let Err(cleanup) = std::fs::remove_file(&staging_path) {
                warn!("Failed to remove staging index {:?}: {}", staging_path, cleanup);
            }
            return Err(AnirecError::build("writing index entries failed", e));
        }

        std::fs::rename(&staging_path, &final_path)
            .map_err(|e| AnirecError::build("publishing index failed", e.into()))?;

        info!("Published index with {} entries at {:?}", entries.len(), final_path);
        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingSignature, HashingEmbedder};
    use crate::error::ErrorKind;
    use async_trait::async_trait;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AnirecError::Embedding("provider down".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(AnirecError::Embedding("provider down".to_string()))
        }

        fn signature(&self) -> EmbeddingSignature {
            EmbeddingSignature::new("failing", 4)
        }
    }

    fn records(texts: &[&str]) -> Vec<CanonicalRecord> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| CanonicalRecord::new(i, t.to_string()))
            .collect()
    }

    fn hashing_builder() -> IndexBuilder {
        IndexBuilder::new(Arc::new(HashingEmbedder::new(64)), ChunkingConfig::default())
    }

    #[tokio::test]
    async fn test_build_publishes_index() {
        let dir = tempfile::tempdir().unwrap();
        let report = hashing_builder()
            .build(&records(&["Title: Planetes", "Title: Yuru Camp"]), dir.path())
            .await
            .unwrap();

        assert_eq!(report.records, 2);
        assert_eq!(report.chunks, 2);
        assert_eq!(report.index_path, dir.path().join(INDEX_FILE_NAME));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let builder = hashing_builder();

        builder
            .build(&records(&["one", "two", "three"]), dir.path())
            .await
            .unwrap();
        builder.build(&records(&["only"]), dir.path()).await.unwrap();

        let index = SqliteVectorIndex::open_in(dir.path()).unwrap();
        assert_eq!(index.entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_embedding_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let builder = IndexBuilder::new(Arc::new(FailingEmbedder), ChunkingConfig::default());

        let err = builder
            .build(&records(&["Title: Trigun"]), dir.path())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Build);
        assert!(matches!(err.root_cause(), AnirecError::Embedding(_)));
        assert!(!dir.path().join(INDEX_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_failed_build_keeps_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        hashing_builder()
            .build(&records(&["kept"]), dir.path())
            .await
            .unwrap();

        let failing = IndexBuilder::new(Arc::new(FailingEmbedder), ChunkingConfig::default());
        assert!(failing.build(&records(&["lost"]), dir.path()).await.is_err());

        let index = SqliteVectorIndex::open_in(dir.path()).unwrap();
        let hits = index.search(&HashingEmbedder::new(64).embed_text("kept"), 1).await.unwrap();
        assert_eq!(hits[0].chunk.content, "kept");
    }

    #[tokio::test]
    async fn test_empty_catalog_is_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = hashing_builder().build(&[], dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Build);
    }
}
