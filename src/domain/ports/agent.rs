use async_trait::async_trait;

use crate::domain::errors::DomainError;

/// An LLM agent that may call tools before answering.
#[async_trait]
pub trait ToolAgent: Send + Sync {
    async fn run(&self, prompt: &str) -> Result<String, DomainError>;
}
