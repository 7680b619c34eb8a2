//! OpenAI-compatible client configuration with sensible defaults.
//!
//! Both the embeddings server and the chat provider speak the OpenAI API, so
//! one client constructor serves both; only the base URL and key differ.

use crate::error::{AnirecError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for provider requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create a client for an OpenAI-compatible API with the default timeout.
pub fn create_client(api_base: &str, api_key: Option<&str>) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(api_base, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a client with a custom timeout.
pub fn create_client_with_timeout(
    api_base: &str,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AnirecError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new().with_api_base(api_base.trim_end_matches('/'));
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
