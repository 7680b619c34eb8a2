//! Build command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::pipeline::BuildPipeline;
use anyhow::Result;

/// Run the build command.
pub async fn run_build(
    input: Option<String>,
    canonical: Option<String>,
    persist_dir: Option<String>,
    from_canonical: bool,
    mut settings: Settings,
) -> Result<()> {
    if let Some(path) = input {
        settings.catalog.raw_path = path;
    }
    if let Some(path) = canonical {
        settings.catalog.canonical_path = path;
    }
    if let Some(dir) = persist_dir {
        settings.index.persist_dir = dir;
    }

    let credentials = Credentials::from_env(&settings);

    let operation = if from_canonical {
        Operation::Reindex
    } else {
        Operation::Build
    };
    if let Err(e) = preflight::check(operation, &settings, &credentials) {
        Output::error(&format!("{}", e));
        Output::info("Run 'anirec doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let pipeline = BuildPipeline::new(settings, &credentials)?;

    let spinner = Output::spinner("Building index...");
    let result = if from_canonical {
        pipeline.rebuild_index().await
    } else {
        pipeline.run().await
    };
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            Output::success("Index built");
            Output::kv("Records", &summary.index.records.to_string());
            Output::kv("Chunks", &summary.index.chunks.to_string());
            Output::kv("Dimensions", &summary.index.dimensions.to_string());
            Output::kv("Index", &summary.index.index_path.display().to_string());
            if summary.skipped_rows > 0 {
                Output::warning(&format!(
                    "Skipped {} catalog rows with missing or malformed fields",
                    summary.skipped_rows
                ));
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            Err(e.into())
        }
    }
}
