//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::embedding::create_embedder;
use crate::rag::{source_title, Retriever};
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    let credentials = Credentials::from_env(&settings);
    preflight::check(Operation::Search, &settings, &credentials)?;

    let embedder = create_embedder(&settings.embedding, &credentials)?;
    let retriever = Retriever::open(&settings.persist_dir(), embedder).await?;

    let spinner = Output::spinner("Searching...");
    let results = retriever.search(query, limit).await;
    spinner.finish_and_clear();

    match results {
        Ok(hits) => {
            if hits.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", hits.len()));
                for (rank, hit) in hits.iter().enumerate() {
                    Output::search_result(rank + 1, &source_title(hit), hit.score, &hit.chunk.content);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(anyhow::anyhow!("{}", e));
        }
    }

    Ok(())
}
