//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for recommendations and catalog search over one
//! shared service.

use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::error::{AnirecError, ErrorKind};
use crate::rag::{source_title, Recommendation};
use crate::service::RecommendationService;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
struct AppState {
    service: RecommendationService,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let credentials = Credentials::from_env(&settings);
    let service = RecommendationService::new(&settings, &credentials).await?;

    let app = router(Arc::new(AppState { service }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Anirec API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Recommend", "POST /recommend");
    Output::kv("Search", "POST /search");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/recommend", post(recommend))
        .route("/search", post(search))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct RecommendRequest {
    query: String,
}

#[derive(Serialize)]
struct RecommendResponse {
    recommendation: String,
    uncertain: bool,
    sources: Vec<SourceInfo>,
}

impl From<Recommendation> for RecommendResponse {
    fn from(rec: Recommendation) -> Self {
        Self {
            uncertain: rec.is_uncertain(),
            sources: rec.sources.iter().map(SourceInfo::from).collect(),
            recommendation: rec.text,
        }
    }
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SourceInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    title: String,
    content: String,
    score: f32,
}

impl From<&crate::index::SearchHit> for SourceInfo {
    fn from(hit: &crate::index::SearchHit) -> Self {
        Self {
            title: source_title(hit),
            content: hit.chunk.content.clone(),
            score: hit.score,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: String,
}

/// HTTP status for a failed request.
fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Generation => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: AnirecError) -> axum::response::Response {
    let kind = e.kind();
    warn!("Request failed: {}", e);
    (
        status_for(kind),
        Json(ErrorResponse {
            error: e.to_string(),
            kind: format!("{:?}", kind),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecommendRequest>,
) -> impl IntoResponse {
    match state.service.recommend_detailed(&req.query).await {
        Ok(rec) => Json(RecommendResponse::from(rec)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> impl IntoResponse {
    match state.service.retriever().search(&req.query, req.limit).await {
        Ok(hits) => Json(SearchResponse {
            results: hits.iter().map(SourceInfo::from).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
