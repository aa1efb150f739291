use crate::domain::errors::DomainError;
use async_trait::async_trait;

/// Single-shot text generation.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError>;
}
