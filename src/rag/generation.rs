//! Recommendation generation: retrieve, compose, ask the model.

use super::prompt::PromptComposer;
use super::retriever::Retriever;
use super::Recommendation;
use crate::config::{Credentials, GenerationSettings, Settings};
use crate::error::{AnirecError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// A text generation backend.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Complete `prompt` and return the model's text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

/// Chat completions against an OpenAI-compatible provider.
pub struct OpenAIChatClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIChatClient {
    pub fn new(client: Client<OpenAIConfig>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Client for the configured provider using `api_key`.
    pub fn from_settings(settings: &GenerationSettings, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AnirecError::Config(format!(
                "{} is empty",
                settings.api_key_env
            )));
        }
        let client = create_client(&settings.base_url, Some(api_key))?;
        Ok(Self::new(client, settings.model.clone()))
    }
}

#[async_trait]
impl GenerationClient for OpenAIChatClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| AnirecError::generation("building chat message failed", AnirecError::Provider(e.to_string())))?
                .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .build()
            .map_err(|e| AnirecError::generation("building chat request failed", AnirecError::Provider(e.to_string())))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            AnirecError::generation(
                "chat completion failed",
                AnirecError::Provider(format!("Chat API error: {}", e)),
            )
        })?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AnirecError::generation_empty("provider returned no choices"))?;

        if text.trim().is_empty() {
            return Err(AnirecError::generation_empty("provider returned empty content"));
        }

        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Runs one recommendation: retrieval, prompt composition, generation.
pub struct GenerationOrchestrator {
    retriever: Retriever,
    client: Arc<dyn GenerationClient>,
    composer: PromptComposer,
}

impl GenerationOrchestrator {
    pub fn new(retriever: Retriever, client: Arc<dyn GenerationClient>) -> Self {
        Self {
            retriever,
            client,
            composer: PromptComposer::new(),
        }
    }

    /// Bind the configured chat model to `retriever`.
    pub fn initialize(retriever: Retriever, credentials: &Credentials, settings: &Settings) -> Result<Self> {
        let api_key = credentials.require_generation_key(settings)?;
        let client = OpenAIChatClient::from_settings(&settings.generation, api_key)?;
        info!(
            "Generation bound to {} at {}",
            settings.generation.model, settings.generation.base_url
        );
        Ok(Self::new(retriever, Arc::new(client)))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Recommend titles for `query` from the indexed catalog.
    #[instrument(skip(self), fields(query = %query, model = %self.client.model()))]
    pub async fn get_recommendation(&self, query: &str) -> Result<Recommendation> {
        let sources = self.retriever.retrieve(query).await.inspect_err(|e| {
            error!("Retrieval failed: {}", e);
        })?;
        debug!("Composing prompt from {} chunks", sources.len());

        let prompt = self.composer.compose(&sources, query);
        let text = self.client.generate(&prompt).await.inspect_err(|e| {
            error!("Generation failed: {}", e);
        })?;

        if text.trim().is_empty() {
            error!("Generation returned an empty answer");
            return Err(AnirecError::generation_empty(format!(
                "{} returned an empty answer",
                self.client.model()
            )));
        }

        Ok(Recommendation { text, sources })
    }
}
