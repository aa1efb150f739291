use async_trait::async_trait;

use crate::domain::{errors::DomainError, Message};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn history(&self, conversation: &str) -> Result<Vec<Message>, DomainError>;
    /// Appends turns, keeping only the newest `window` messages.
    async fn append(
        &self,
        conversation: &str,
        messages: &[Message],
        window: usize,
    ) -> Result<(), DomainError>;
}
