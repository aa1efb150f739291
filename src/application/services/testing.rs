//! Deterministic port implementations shared by the service tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::{
    ports::{EmbeddingService, LlmService},
    DomainError, Embedding,
};

/// Embeds text as its a-z letter histogram, so texts sharing letters rank close.
pub struct LetterEmbedding;

impl LetterEmbedding {
    fn vector(text: &str) -> Embedding {
        let mut counts = vec![0.0f32; 26];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            counts[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Embedding::new(counts)
    }
}

#[async_trait]
impl EmbeddingService for LetterEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        26
    }
}

/// Records prompts and replies with a canned answer, or echoes the prompt.
#[derive(Default)]
pub struct EchoLlm {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl EchoLlm {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for EchoLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone().unwrap_or_else(|| prompt.to_string()))
    }
}
