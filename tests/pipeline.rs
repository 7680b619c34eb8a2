//! End-to-end: raw catalog in, recommendations out, with a local embedder
//! and a scripted chat model.

use anirec::chunking::ChunkingConfig;
use anirec::config::{Credentials, EmbeddingProvider, Settings};
use anirec::embedding::{create_embedder, HashingEmbedder};
use anirec::error::{AnirecError, ErrorKind};
use anirec::index::{IndexBuilder, INDEX_FILE_NAME};
use anirec::ingest::{load_canonical, DocumentIngestor};
use anirec::pipeline::BuildPipeline;
use anirec::rag::{GenerationClient, GenerationOrchestrator, Retriever};
use anirec::service::RecommendationService;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

const CATALOG: &str = "\
MAL_ID,Name,Score,Genres,English name,sypnopsis
1,Cowboy Bebop,8.78,\"Action, Adventure, Comedy, Drama, Sci-Fi, Space\",Cowboy Bebop,\"In the year 2071, a ragtag crew of bounty hunters chase criminals across the solar system aboard the spaceship Bebop.\"
6,Trigun,8.24,\"Action, Sci-Fi, Adventure, Comedy, Drama, Shounen\",Trigun,\"Vash the Stampede, a gunslinger with a sixty billion double dollar bounty, wanders a desert planet.\"
329,Planetes,8.31,\"Comedy, Drama, Romance, Sci-Fi, Seinen, Space\",Planetes,\"Debris collectors clean up orbital junk in 2075 while dreaming of deep space.\"
5114,Fullmetal Alchemist: Brotherhood,9.19,\"Action, Military, Adventure, Comedy, Drama, Magic, Fantasy, Shounen\",,
";

/// Answers with three picks, or declines when asked about cooking.
struct ScriptedModel;

#[async_trait]
impl GenerationClient for ScriptedModel {
    async fn generate(&self, prompt: &str) -> anirec::Result<String> {
        if prompt.contains("cooking") {
            return Ok("I don't know of any cooking anime in this catalog.".to_string());
        }
        Ok("1. Cowboy Bebop - Bounty hunters in 2071. Matches your taste for space westerns.\n\
            2. Planetes - Debris collectors in orbit. A grounded take on space work.\n\
            3. Trigun - A gunslinger on a desert planet. Shares the frontier mood."
            .to_string())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

fn settings_in(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.catalog.raw_path = dir.join("anime_with_synopsis.csv").to_string_lossy().into_owned();
    settings.catalog.canonical_path = dir.join("anime_updated.csv").to_string_lossy().into_owned();
    settings.index.persist_dir = dir.join("chroma_db").to_string_lossy().into_owned();
    settings.embedding.provider = EmbeddingProvider::Hashing;
    settings.embedding.dimensions = 256;
    settings
}

async fn built_service(dir: &Path) -> RecommendationService {
    std::fs::write(dir.join("anime_with_synopsis.csv"), CATALOG).unwrap();
    let settings = settings_in(dir);
    let credentials = Credentials::from_lookup(&settings, |_| None);

    BuildPipeline::new(settings.clone(), &credentials)
        .unwrap()
        .run()
        .await
        .unwrap();

    let embedder = create_embedder(&settings.embedding, &credentials).unwrap();
    let retriever = Retriever::open(&settings.persist_dir(), embedder).await.unwrap();
    RecommendationService::with_components(GenerationOrchestrator::new(retriever, Arc::new(ScriptedModel)))
}

#[tokio::test]
async fn build_writes_canonical_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let _ = built_service(dir.path()).await;

    let records = load_canonical(&dir.path().join("anime_updated.csv")).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records[0].text.starts_with("Title: Cowboy Bebop Overview: In the year 2071"));
    assert!(records[0].text.ends_with("Genre: Action, Adventure, Comedy, Drama, Sci-Fi, Space "));
    assert!(dir.path().join("chroma_db").join(INDEX_FILE_NAME).exists());
}

#[tokio::test]
async fn every_record_retrieves_itself() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("anime_with_synopsis.csv"), CATALOG).unwrap();
    let canonical = dir.path().join("anime_updated.csv");
    let outcome = DocumentIngestor::new(dir.path().join("anime_with_synopsis.csv"), &canonical)
        .ingest()
        .unwrap();

    let embedder = Arc::new(HashingEmbedder::new(256));
    IndexBuilder::new(embedder.clone(), ChunkingConfig::default())
        .build(&outcome.records, &dir.path().join("chroma_db"))
        .await
        .unwrap();

    let retriever = Retriever::open(&dir.path().join("chroma_db"), embedder)
        .await
        .unwrap()
        .with_top_k(1);
    for record in &outcome.records {
        let hits = retriever.retrieve(&record.text).await.unwrap();
        assert!(
            hits[0].chunk.record_index == record.index,
            "record {} not retrieved by its own text",
            record.index
        );
    }
}

#[tokio::test]
async fn recommend_returns_three_numbered_entries() {
    let dir = tempfile::tempdir().unwrap();
    let service = built_service(dir.path()).await;

    let rec = service
        .recommend_detailed("space westerns with bounty hunters")
        .await
        .unwrap();

    assert!(!rec.text.trim().is_empty());
    assert_eq!(rec.numbered_entries().len(), 3);
    assert!(!rec.sources.is_empty());
}

#[tokio::test]
async fn off_topic_query_passes_uncertainty_through() {
    let dir = tempfile::tempdir().unwrap();
    let service = built_service(dir.path()).await;

    let text = service.recommend("cooking competitions").await.unwrap();
    assert_eq!(text, "I don't know of any cooking anime in this catalog.");
}

#[tokio::test]
async fn missing_index_fails_initialization() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let credentials = Credentials::from_lookup(&settings, |_| Some("gsk_test".to_string()));

    let err = RecommendationService::new(&settings, &credentials)
        .await
        .err()
        .unwrap();

    assert_eq!(err.kind(), ErrorKind::Initialization);
    assert!(matches!(err.root_cause(), AnirecError::IndexNotFound(_)));
}

#[tokio::test]
async fn missing_key_fails_initialization() {
    let dir = tempfile::tempdir().unwrap();
    let _ = built_service(dir.path()).await;
    let settings = settings_in(dir.path());
    let credentials = Credentials::from_lookup(&settings, |_| None);

    let err = RecommendationService::new(&settings, &credentials)
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Initialization);
}
