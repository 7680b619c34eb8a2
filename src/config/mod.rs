//! Configuration module for Anirec.
//!
//! Handles loading application settings and resolving API credentials.

mod settings;

pub use settings::{
    CatalogSettings, Credentials, EmbeddingProvider, EmbeddingSettings, GeneralSettings,
    GenerationSettings, IndexSettings, Settings,
};
