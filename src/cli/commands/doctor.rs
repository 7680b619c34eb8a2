//! Doctor command - verify credentials, catalog and index.

use crate::cli::Output;
use crate::config::{Credentials, Settings};
use crate::embedding::create_embedder;
use crate::error::AnirecError;
use crate::index::{SqliteVectorIndex, VectorIndex};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Anirec Doctor");
    println!();
    println!("Checking credentials, catalog and index...\n");

    let credentials = Credentials::from_env(settings);
    let mut checks = Vec::new();

    println!("{}", style("API Configuration").bold());
    let api_check = check_generation_key(settings, &credentials);
    api_check.print();
    checks.push(api_check);

    println!();

    println!("{}", style("Catalog").bold());
    let catalog_checks = check_catalog(settings);
    for check in &catalog_checks {
        check.print();
    }
    checks.extend(catalog_checks);

    println!();

    println!("{}", style("Index").bold());
    let index_check = check_index(settings, &credentials).await;
    index_check.print();
    checks.push(index_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Anirec.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s).",
            warnings
        ));
    } else {
        Output::success("All checks passed! Anirec is ready to use.");
    }

    Ok(())
}

/// Check that the chat provider key is configured.
fn check_generation_key(settings: &Settings, credentials: &Credentials) -> CheckResult {
    let var = &settings.generation.api_key_env;
    match credentials.generation_api_key.as_deref() {
        Some(key) => CheckResult::ok(var, &format!("configured ({})", mask_key(key))),
        None => CheckResult::error(var, "not set", &format!("Set with: export {}='gsk_...'", var)),
    }
}

/// Show only the ends of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check the raw and canonical catalog files.
fn check_catalog(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let raw = settings.raw_catalog_path();
    if raw.is_file() {
        let size = std::fs::metadata(&raw)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        results.push(CheckResult::ok(
            "Raw catalog",
            &format!("{} ({})", raw.display(), size),
        ));
    } else {
        results.push(CheckResult::warning(
            "Raw catalog",
            &format!("{} (not found)", raw.display()),
            "Only needed for 'anirec build'",
        ));
    }

    let canonical = settings.canonical_catalog_path();
    if canonical.is_file() {
        results.push(CheckResult::ok("Canonical catalog", &format!("{}", canonical.display())));
    } else {
        results.push(CheckResult::warning(
            "Canonical catalog",
            &format!("{} (not created yet)", canonical.display()),
            "Created by 'anirec build'",
        ));
    }

    results
}

/// Check that the index opens and matches the configured embedder.
async fn check_index(settings: &Settings, credentials: &Credentials) -> CheckResult {
    let dir = settings.persist_dir();
    let index = match SqliteVectorIndex::open_in(&dir) {
        Ok(index) => index,
        Err(AnirecError::IndexNotFound(_)) => {
            return CheckResult::error(
                "Index",
                &format!("{} (not built)", dir.display()),
                "Build with: anirec build",
            )
        }
        Err(e) => return CheckResult::error("Index", &e.to_string(), "Rebuild with: anirec build"),
    };

    let embedder = match create_embedder(&settings.embedding, credentials) {
        Ok(embedder) => embedder,
        Err(e) => return CheckResult::error("Index", &e.to_string(), "Check the [embedding] settings"),
    };

    let entries = index.entry_count().await.unwrap_or(0);
    match index.signature().await {
        Ok(Some(built)) if built == embedder.signature() => {
            let built_at = index
                .built_at()
                .ok()
                .flatten()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            CheckResult::ok(
                "Index",
                &format!("{} entries, {}, built {}", entries, built, built_at),
            )
        }
        Ok(Some(built)) => CheckResult::error(
            "Index",
            &format!("built with {} but configured for {}", built, embedder.signature()),
            "Rebuild with: anirec build",
        ),
        Ok(None) => CheckResult::error("Index", "no embedding metadata", "Rebuild with: anirec build"),
        Err(e) => CheckResult::error("Index", &e.to_string(), "Rebuild with: anirec build"),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: anirec config edit",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("gsk_abcdefghijklmnop"), "gsk_...mnop");
        assert_eq!(mask_key("short"), "*****");
    }

    #[tokio::test]
    async fn test_check_index_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.index.persist_dir = dir.path().join("chroma_db").to_string_lossy().into_owned();
        let credentials = Credentials::from_lookup(&settings, |_| None);

        let result = check_index(&settings, &credentials).await;
        assert_eq!(result.status, CheckStatus::Error);
        assert!(result.message.contains("not built"));
    }
}
