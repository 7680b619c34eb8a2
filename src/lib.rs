//! Anirec - anime recommendations grounded in your own catalog
//!
//! A small retrieval-augmented recommender: an anime catalog CSV is turned
//! into a persisted vector index once, and free-text requests are then
//! answered with three recommendations drawn from the closest catalog
//! entries.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings file and credentials
//! - `ingest` - Catalog CSV validation and canonicalization
//! - `chunking` - Character-bounded text splitting
//! - `embedding` - Embedding generation
//! - `index` - Persisted vector index and its builder
//! - `rag` - Retrieval, prompt composition and generation
//! - `pipeline` - Offline build coordination
//! - `service` - Query-time entry point
//!
//! # Example
//!
//! ```rust,no_run
//! use anirec::config::{Credentials, Settings};
//! use anirec::service::RecommendationService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let credentials = Credentials::from_env(&settings);
//!     let service = RecommendationService::new(&settings, &credentials).await?;
//!
//!     println!("{}", service.recommend("light-hearted space adventures").await?);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod openai;
pub mod pipeline;
pub mod rag;
pub mod service;

pub use error::{AnirecError, Result};
