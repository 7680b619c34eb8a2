//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            println!("{}", annotated(&settings, &config_path)?);
        }

        ConfigAction::Edit => {
            if !config_path.exists() {
                settings.save_to(&config_path)?;
                Output::info(&format!("Wrote defaults to {}", config_path.display()));
            }

            let editor = std::env::var("VISUAL")
                .or_else(|_| std::env::var("EDITOR"))
                .unwrap_or_else(|_| "vi".to_string());
            let status = std::process::Command::new(&editor).arg(&config_path).status();

            match status {
                Ok(s) if s.success() => report_validity(&config_path),
                Ok(_) => Output::warning(&format!("{} exited with non-zero status", editor)),
                Err(e) => {
                    Output::error(&format!("Failed to start {}: {}", editor, e));
                    Output::kv("Config file", &config_path.display().to_string());
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

/// Effective settings as TOML, prefixed with where they were read from.
fn annotated(settings: &Settings, config_path: &Path) -> Result<String> {
    let origin = if config_path.exists() {
        format!("# loaded from {}", config_path.display())
    } else {
        format!("# defaults ({} does not exist)", config_path.display())
    };
    let body = toml::to_string_pretty(settings)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
    Ok(format!("{}\n\n{}", origin, body))
}

/// Re-read an edited file so mistakes surface now rather than at build time.
fn report_validity(config_path: &Path) {
    match Settings::load_from(Some(&config_path.to_path_buf())) {
        Ok(_) => Output::success("Config saved and valid."),
        Err(e) => {
            Output::error(&format!("Config saved but invalid: {}", e));
            Output::info("Run 'anirec config edit' again to fix it.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_names_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let shown = annotated(&Settings::default(), &path).unwrap();
        assert!(shown.starts_with("# defaults"));
        assert!(shown.contains("llama-3.1-8b-instant"));

        Settings::default().save_to(&path).unwrap();
        let shown = annotated(&Settings::default(), &path).unwrap();
        assert!(shown.starts_with("# loaded from"));
    }

    #[test]
    fn test_saved_defaults_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Settings::default().save_to(&path).unwrap();
        let reloaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(reloaded.index.top_k, Settings::default().index.top_k);
    }
}
