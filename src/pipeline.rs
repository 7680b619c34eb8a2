//! Offline build pipeline.
//!
//! Runs ingestion and index construction end to end: raw catalog CSV in,
//! canonical CSV and a persisted vector index out.

use crate::chunking::ChunkingConfig;
use crate::config::{Credentials, Settings};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{AnirecError, Result};
use crate::index::{BuildReport, IndexBuilder};
use crate::ingest::{load_canonical, DocumentIngestor};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// What a finished build produced.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// Rows dropped during ingestion.
    pub skipped_rows: usize,
    /// Index construction report.
    pub index: BuildReport,
}

/// Builds the canonical catalog and the vector index from settings.
pub struct BuildPipeline {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
}

impl BuildPipeline {
    /// Create a pipeline using the embedder selected by the settings.
    pub fn new(settings: Settings, credentials: &Credentials) -> Result<Self> {
        let embedder = create_embedder(&settings.embedding, credentials)
            .map_err(|e| AnirecError::build("failed to create embedder", e))?;
        Ok(Self::with_embedder(settings, embedder))
    }

    /// Create a pipeline with a custom embedder.
    pub fn with_embedder(settings: Settings, embedder: Arc<dyn Embedder>) -> Self {
        Self { settings, embedder }
    }

    /// Run the whole build. Any failure is logged and returned as a build
    /// error; a failed run leaves any previously published index in place.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<BuildSummary> {
        info!("Starting to build pipeline...");

        self.run_inner().await.inspect_err(|e| {
            error!("Failed to build pipeline: {}", e);
        })
    }

    /// Rebuild the index from the canonical catalog alone, without reading
    /// the raw catalog.
    #[instrument(skip(self))]
    pub async fn rebuild_index(&self) -> Result<BuildSummary> {
        info!("Rebuilding index from canonical catalog...");

        let report = self.index_canonical().await.inspect_err(|e| {
            error!("Failed to rebuild index: {}", e);
        })?;
        Ok(BuildSummary {
            skipped_rows: 0,
            index: report,
        })
    }

    async fn run_inner(&self) -> Result<BuildSummary> {
        let ingestor = DocumentIngestor::new(
            self.settings.raw_catalog_path(),
            self.settings.canonical_catalog_path(),
        );
        let outcome = ingestor
            .ingest()
            .map_err(|e| AnirecError::build("failed to load catalog", e))?;
        info!("Data loaded and processed...");

        let report = self.index_canonical().await?;

        info!("Pipeline built successfully");
        Ok(BuildSummary {
            skipped_rows: outcome.skipped(),
            index: report,
        })
    }

    /// Index whatever the canonical catalog file holds.
    async fn index_canonical(&self) -> Result<BuildReport> {
        let chunking = ChunkingConfig::from_settings(&self.settings.index)
            .map_err(|e| AnirecError::build("invalid chunking settings", e))?;

        let canonical_path = self.settings.canonical_catalog_path();
        let records = load_canonical(&canonical_path).map_err(|e| {
            AnirecError::build(
                format!("failed to read canonical catalog {}", canonical_path.display()),
                e,
            )
        })?;

        let builder = IndexBuilder::new(self.embedder.clone(), chunking);
        let report = match builder.build(&records, &self.settings.persist_dir()).await {
            Ok(report) => report,
            // The builder already classifies its failures.
            Err(e @ AnirecError::Build { .. }) => return Err(e),
            Err(e) => return Err(AnirecError::build("failed to build vector store", e)),
        };
        info!("Vector store built successfully");
        Ok(report)
    }
}
