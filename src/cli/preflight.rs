//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials and inputs are available before starting
//! operations that would otherwise fail midway.

use crate::config::{Credentials, EmbeddingProvider, Settings};
use crate::error::{AnirecError, Result};
use crate::index::INDEX_FILE_NAME;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Building requires the raw catalog.
    Build,
    /// Rebuilding the index requires the canonical catalog.
    Reindex,
    /// Recommending requires the generation key and a built index.
    Recommend,
    /// Search requires a built index.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings, credentials: &Credentials) -> Result<()> {
    match operation {
        Operation::Build => {
            check_raw_catalog(settings)?;
            check_embedding_key(settings, credentials)?;
        }
        Operation::Reindex => {
            check_canonical_catalog(settings)?;
            check_embedding_key(settings, credentials)?;
        }
        Operation::Recommend => {
            credentials.require_generation_key(settings)?;
            check_index(settings)?;
        }
        Operation::Search => {
            check_index(settings)?;
        }
    }
    Ok(())
}

fn check_raw_catalog(settings: &Settings) -> Result<()> {
    let path = settings.raw_catalog_path();
    if path.is_file() {
        Ok(())
    } else {
        Err(AnirecError::Config(format!(
            "Catalog not found at {}. Set catalog.raw_path or pass --input",
            path.display()
        )))
    }
}

fn check_canonical_catalog(settings: &Settings) -> Result<()> {
    let path = settings.canonical_catalog_path();
    if path.is_file() {
        Ok(())
    } else {
        Err(AnirecError::Config(format!(
            "Canonical catalog not found at {}. Run 'anirec build' first",
            path.display()
        )))
    }
}

/// An embedding server that names a key variable must have it set.
fn check_embedding_key(settings: &Settings, credentials: &Credentials) -> Result<()> {
    match (&settings.embedding.provider, &settings.embedding.api_key_env) {
        (EmbeddingProvider::OpenAI, Some(var)) if credentials.embedding_api_key.is_none() => {
            Err(AnirecError::Config(format!("{} not set", var)))
        }
        _ => Ok(()),
    }
}

fn check_index(settings: &Settings) -> Result<()> {
    let path = settings.persist_dir().join(INDEX_FILE_NAME);
    if path.is_file() {
        Ok(())
    } else {
        Err(AnirecError::IndexNotFound(settings.persist_dir()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_in(dir: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.catalog.raw_path = dir.join("anime.csv").to_string_lossy().into_owned();
        settings.catalog.canonical_path = dir.join("anime_updated.csv").to_string_lossy().into_owned();
        settings.index.persist_dir = dir.join("chroma_db").to_string_lossy().into_owned();
        settings
    }

    #[test]
    fn test_search_requires_index() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let credentials = Credentials::from_lookup(&settings, |_| None);

        let err = check(Operation::Search, &settings, &credentials).unwrap_err();
        assert!(matches!(err, AnirecError::IndexNotFound(_)));

        std::fs::create_dir_all(settings.persist_dir()).unwrap();
        std::fs::write(settings.persist_dir().join(INDEX_FILE_NAME), b"").unwrap();
        assert!(check(Operation::Search, &settings, &credentials).is_ok());
    }

    #[test]
    fn test_recommend_requires_key() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let credentials = Credentials::from_lookup(&settings, |_| None);

        let err = check(Operation::Recommend, &settings, &credentials).unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_build_requires_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let credentials = Credentials::from_lookup(&settings, |_| None);

        assert!(check(Operation::Build, &settings, &credentials).is_err());
        std::fs::write(dir.path().join("anime.csv"), "Name,Genres,Synopsis\n").unwrap();
        assert!(check(Operation::Build, &settings, &credentials).is_ok());
    }

    #[test]
    fn test_reindex_requires_canonical_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let credentials = Credentials::from_lookup(&settings, |_| None);

        let err = check(Operation::Reindex, &settings, &credentials).unwrap_err();
        assert!(err.to_string().contains("anirec build"));
        std::fs::write(dir.path().join("anime_updated.csv"), "combined
").unwrap();
        assert!(check(Operation::Reindex, &settings, &credentials).is_ok());
    }
}
