//! Configuration settings for Anirec.

use crate::error::{AnirecError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub catalog: CatalogSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub generation: GenerationSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Locations of the raw catalog and its canonical intermediate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Raw catalog CSV with Name, Genres and Synopsis columns.
    pub raw_path: String,
    /// Canonical single-column CSV written by ingestion.
    pub canonical_path: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            raw_path: "data/anime_with_synopsis.csv".to_string(),
            canonical_path: "data/anime_updated.csv".to_string(),
        }
    }
}

/// Embedding provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Any server speaking the OpenAI embeddings API (default).
    #[default]
    OpenAI,
    /// Local feature-hashing embedder, no network access.
    Hashing,
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, hashing).
    pub provider: EmbeddingProvider,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Texts per embeddings request.
    pub batch_size: usize,
    /// Environment variable holding the embeddings API key, if the server needs one.
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAI,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            batch_size: 64,
            api_key_env: None,
        }
    }
}

/// Chunking and index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Directory holding the persisted index.
    pub persist_dir: String,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            persist_dir: "chroma_db".to_string(),
            chunk_size: 1000,
            chunk_overlap: 0,
            top_k: 4,
        }
    }
}

/// Generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Base URL of the OpenAI-compatible chat completions API.
    pub base_url: String,
    /// Chat model used for recommendations.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Older variable names still accepted for the API key.
    pub legacy_api_key_envs: Vec<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            legacy_api_key_envs: vec!["GROP_API_KEY".to_string()],
        }
    }
}

/// API credentials resolved once at startup and passed down explicitly.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Key for the generation provider.
    pub generation_api_key: Option<String>,
    /// Key for the embeddings provider, when it needs one.
    pub embedding_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("generation_api_key", &self.generation_api_key.as_ref().map(|_| "<redacted>"))
            .field("embedding_api_key", &self.embedding_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env(settings: &Settings) -> Self {
        Self::from_lookup(settings, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary lookup (used by tests).
    pub fn from_lookup<F>(settings: &Settings, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let generation = &settings.generation;
        let generation_api_key = std::iter::once(&generation.api_key_env)
            .chain(generation.legacy_api_key_envs.iter())
            .filter_map(|name| lookup(name.as_str()))
            .find(|key| !key.trim().is_empty());

        let embedding_api_key = settings
            .embedding
            .api_key_env
            .as_deref()
            .and_then(|name| lookup(name))
            .filter(|key| !key.trim().is_empty());

        Self {
            generation_api_key,
            embedding_api_key,
        }
    }

    /// The generation key, or a configuration error naming the variable to set.
    pub fn require_generation_key(&self, settings: &Settings) -> Result<&str> {
        self.generation_api_key.as_deref().ok_or_else(|| {
            AnirecError::Config(format!(
                "{} not set. Set it with: export {}='gsk_...'",
                settings.generation.api_key_env, settings.generation.api_key_env
            ))
        })
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.index.chunk_size == 0 {
            return Err(AnirecError::Config("index.chunk_size must be positive".to_string()));
        }
        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(AnirecError::Config(format!(
                "index.chunk_overlap ({}) must be smaller than index.chunk_size ({})",
                self.index.chunk_overlap, self.index.chunk_size
            )));
        }
        if self.index.top_k == 0 {
            return Err(AnirecError::Config("index.top_k must be positive".to_string()));
        }
        if self.embedding.dimensions == 0 {
            return Err(AnirecError::Config("embedding.dimensions must be positive".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(AnirecError::Config("embedding.batch_size must be positive".to_string()));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AnirecError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("anirec")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded raw catalog path.
    pub fn raw_catalog_path(&self) -> PathBuf {
        Self::expand_path(&self.catalog.raw_path)
    }

    /// Get the expanded canonical catalog path.
    pub fn canonical_catalog_path(&self) -> PathBuf {
        Self::expand_path(&self.catalog.canonical_path)
    }

    /// Get the expanded index directory.
    pub fn persist_dir(&self) -> PathBuf {
        Self::expand_path(&self.index.persist_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_catalog_pipeline() {
        let settings = Settings::default();
        assert_eq!(settings.index.chunk_size, 1000);
        assert_eq!(settings.index.chunk_overlap, 0);
        assert_eq!(settings.generation.model, "llama-3.1-8b-instant");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [index]
            top_k = 6

            [embedding]
            provider = "hashing"
            "#,
        )
        .unwrap();

        assert_eq!(settings.index.top_k, 6);
        assert_eq!(settings.index.persist_dir, "chroma_db");
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Hashing);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut settings = Settings::default();
        settings.index.chunk_overlap = 1000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_credentials_fall_back_to_legacy_name() {
        let settings = Settings::default();
        let env: HashMap<&str, &str> = [("GROP_API_KEY", "legacy-key")].into_iter().collect();

        let creds = Credentials::from_lookup(&settings, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(creds.generation_api_key.as_deref(), Some("legacy-key"));
    }

    #[test]
    fn test_blank_credentials_are_absent() {
        let settings = Settings::default();
        let creds = Credentials::from_lookup(&settings, |_| Some("   ".to_string()));
        assert!(creds.generation_api_key.is_none());
        assert!(creds.require_generation_key(&settings).is_err());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials {
            generation_api_key: Some("gsk_secret".to_string()),
            embedding_api_key: None,
        };
        assert!(!format!("{:?}", creds).contains("gsk_secret"));
    }
}
