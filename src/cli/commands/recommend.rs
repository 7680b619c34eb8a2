//! Recommend command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::rag::source_title;
use crate::service::RecommendationService;
use anyhow::Result;

/// Run the recommend command.
pub async fn run_recommend(query: &str, show_sources: bool, settings: Settings) -> Result<()> {
    let credentials = Credentials::from_env(&settings);

    if let Err(e) = preflight::check(Operation::Recommend, &settings, &credentials) {
        Output::error(&format!("{}", e));
        Output::info("Run 'anirec doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let service = RecommendationService::new(&settings, &credentials).await?;

    let spinner = Output::spinner("Finding recommendations...");
    let result = service.recommend_detailed(query).await;
    spinner.finish_and_clear();

    match result {
        Ok(recommendation) => {
            println!("\n{}\n", recommendation.text.trim_end());

            if show_sources && !recommendation.sources.is_empty() {
                Output::header("Sources");
                for (rank, source) in recommendation.sources.iter().enumerate() {
                    Output::search_result(
                        rank + 1,
                        &source_title(source),
                        source.score,
                        &source.chunk.content,
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to get recommendation: {}", e));
            Err(e.into())
        }
    }
}
