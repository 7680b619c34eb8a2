//! The query-side entry point.
//!
//! A [`RecommendationService`] is assembled once, failing fast if any part is
//! missing, and then answers queries until dropped.

use crate::config::{Credentials, Settings};
use crate::embedding::create_embedder;
use crate::error::{AnirecError, Result};
use crate::rag::{GenerationOrchestrator, Recommendation, Retriever};
use tracing::{error, info, instrument};

/// Answers natural-language anime queries from the persisted index.
pub struct RecommendationService {
    orchestrator: GenerationOrchestrator,
}

impl RecommendationService {
    /// Open the index in `settings.index.persist_dir` and bind the chat model.
    ///
    /// Every failure is reported as an initialization error; there is no
    /// partially working service.
    #[instrument(skip_all)]
    pub async fn new(settings: &Settings, credentials: &Credentials) -> Result<Self> {
        let persist_dir = settings.persist_dir();

        let embedder = create_embedder(&settings.embedding, credentials)
            .map_err(|e| AnirecError::initialization("failed to create embedder", e))?;

        let retriever = Retriever::open(&persist_dir, embedder)
            .await
            .map_err(|e| {
                AnirecError::initialization(
                    format!("failed to open index at {}", persist_dir.display()),
                    e,
                )
            })?
            .with_top_k(settings.index.top_k);

        let orchestrator = GenerationOrchestrator::initialize(retriever, credentials, settings)
            .map_err(|e| AnirecError::initialization("failed to initialize generation", e))?;

        info!("Recommendation service ready");
        Ok(Self::with_components(orchestrator))
    }

    /// Assemble a service from a prebuilt orchestrator.
    pub fn with_components(orchestrator: GenerationOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn retriever(&self) -> &Retriever {
        self.orchestrator.retriever()
    }

    /// Recommendation text for `query`.
    pub async fn recommend(&self, query: &str) -> Result<String> {
        self.recommend_detailed(query).await.map(|rec| rec.text)
    }

    /// Recommendation text plus the catalog chunks it was drawn from.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn recommend_detailed(&self, query: &str) -> Result<Recommendation> {
        if query.trim().is_empty() {
            return Err(AnirecError::request(
                query,
                AnirecError::InvalidInput("query is empty".to_string()),
            ));
        }

        info!("Received query: {}", query);

        match self.orchestrator.get_recommendation(query).await {
            Ok(rec) => {
                info!("Recommendation generated from {} sources", rec.sources.len());
                Ok(rec)
            }
            Err(e) => {
                error!("Failed to get recommendation: {}", e);
                Err(AnirecError::request(query, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;
    use crate::config::EmbeddingProvider;
    use crate::embedding::{Embedder, HashingEmbedder};
    use crate::error::ErrorKind;
    use crate::index::{IndexEntry, MemoryVectorIndex, VectorIndex};
    use crate::rag::GenerationClient;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct CannedClient(Option<String>);

    #[async_trait]
    impl GenerationClient for CannedClient {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.0
                .clone()
                .ok_or_else(|| AnirecError::generation_empty("provider returned no choices"))
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    async fn service(reply: Option<String>) -> RecommendationService {
        let embedder = HashingEmbedder::new(32);
        let text = "Title: Planetes Overview: Debris collectors in orbit. Genre: Drama, Space ";
        let index = MemoryVectorIndex::new();
        index
            .build(
                &embedder.signature(),
                &[IndexEntry::new(
                    Chunk {
                        record_index: 0,
                        order: 0,
                        content: text.to_string(),
                    },
                    embedder.embed_text(text),
                )],
            )
            .await
            .unwrap();
        let retriever = Retriever::new(Arc::new(index), Arc::new(embedder)).await.unwrap();
        RecommendationService::with_components(GenerationOrchestrator::new(
            retriever,
            Arc::new(CannedClient(reply)),
        ))
    }

    #[tokio::test]
    async fn test_recommend_returns_text() {
        let svc = service(Some("1. Planetes\n2. Space Brothers\n3. Cowboy Bebop".into())).await;
        let text = svc.recommend("realistic space work").await.unwrap();
        assert!(text.starts_with("1. Planetes"));
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected() {
        let svc = service(Some("unused".into())).await;
        let err = svc.recommend("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_failure_carries_query() {
        let svc = service(None).await;
        let err = svc.recommend("mecha dramas").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Generation);
        assert!(matches!(err, AnirecError::Request { ref query, .. } if query == "mecha dramas"));
    }

    #[tokio::test]
    async fn test_empty_answer_is_never_success() {
        let svc = service(Some(String::new())).await;
        let err = svc.recommend("realistic space work").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Generation);
        assert!(matches!(err, AnirecError::Request { .. }));
    }

    #[tokio::test]
    async fn test_missing_index_fails_initialization() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.index.persist_dir = dir.path().join("chroma_db").to_string_lossy().into_owned();
        settings.embedding.provider = EmbeddingProvider::Hashing;
        let credentials = Credentials::from_lookup(&settings, |_| Some("gsk_test".to_string()));

        let err = RecommendationService::new(&settings, &credentials).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert!(matches!(err.root_cause(), AnirecError::IndexNotFound(_)));
    }
}
