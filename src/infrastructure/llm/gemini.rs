use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::gemini;

use crate::domain::{ports::LlmService, DomainError};
use crate::infrastructure::config::LlmConfig;

/// Builds the rig Gemini client shared by completions, embeddings and the agent.
pub fn gemini_client(api_key: &str) -> Result<gemini::Client, DomainError> {
    gemini::Client::new(api_key)
        .map_err(|e| DomainError::internal(format!("Failed to build Gemini client: {e}")))
}

pub struct GeminiLlm {
    client: gemini::Client,
    model: String,
    temperature: f64,
}

impl GeminiLlm {
    pub fn new(client: gemini::Client, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.0,
        }
    }

    pub fn from_config(client: gemini::Client, config: &LlmConfig) -> Self {
        Self::new(client, config.model.clone()).with_temperature(config.temperature)
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl LlmService for GeminiLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        let agent = self
            .client
            .agent(&self.model)
            .temperature(self.temperature)
            .build();
        agent.prompt(prompt).await.map_err(provider_error)
    }
}

/// Quota errors surface as a 429 or RESOURCE_EXHAUSTED in the provider message.
fn provider_error(e: impl std::fmt::Display) -> DomainError {
    let message = e.to_string();
    if message.contains("429") || message.contains("RESOURCE_EXHAUSTED") {
        DomainError::rate_limited(message)
    } else {
        DomainError::external(message)
    }
}
