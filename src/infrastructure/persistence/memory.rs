use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::{ports::ConversationStore, DomainError, Message};

/// Conversation buffers held in process memory, used when Redis is not configured.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: Mutex<HashMap<String, Vec<Message>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn history(&self, conversation: &str) -> Result<Vec<Message>, DomainError> {
        Ok(self
            .conversations
            .lock()
            .await
            .get(conversation)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(
        &self,
        conversation: &str,
        messages: &[Message],
        window: usize,
    ) -> Result<(), DomainError> {
        let mut conversations = self.conversations.lock().await;
        let buffer = conversations.entry(conversation.to_string()).or_default();
        buffer.extend_from_slice(messages);

        if window > 0 && buffer.len() > window {
            let excess = buffer.len() - window;
            buffer.drain(..excess);
        }
        Ok(())
    }
}
