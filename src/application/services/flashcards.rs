use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::application::services::rag::join_context;
use crate::application::RagService;
use crate::domain::{
    ports::{EmbeddingService, LlmService, StackStore, VectorStore},
    DomainError, NewStack, PromptTemplate, Stack, TextSplitter,
};

const CONCEPTS_QUERY: &str = "the most important concepts, definitions and terminology";

/// Generates flashcard stacks from documents and manages the stored stacks.
pub struct FlashcardService {
    embedding: Arc<dyn EmbeddingService>,
    llm: Arc<dyn LlmService>,
    store: Arc<dyn StackStore>,
    new_vector_store: Box<dyn Fn() -> Arc<dyn VectorStore> + Send + Sync>,
    splitter: TextSplitter,
    top_k: usize,
    template: PromptTemplate,
}

impl FlashcardService {
    /// `new_vector_store` builds the scratch index used for one generation, so
    /// concurrent uploads never see each other's chunks.
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        llm: Arc<dyn LlmService>,
        store: Arc<dyn StackStore>,
        new_vector_store: impl Fn() -> Arc<dyn VectorStore> + Send + Sync + 'static,
        splitter: TextSplitter,
        top_k: usize,
        template: PromptTemplate,
    ) -> Self {
        Self {
            embedding,
            llm,
            store,
            new_vector_store: Box::new(new_vector_store),
            splitter,
            top_k,
            template,
        }
    }

    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn generate(&self, name: &str, text: &str) -> Result<Stack, DomainError> {
        let chunks = self.splitter.split_document(Uuid::new_v4(), text);
        if chunks.is_empty() {
            return Err(DomainError::validation(format!(
                "no text could be extracted from {name}"
            )));
        }

        let rag = RagService::new(
            self.embedding.clone(),
            (self.new_vector_store)(),
            self.llm.clone(),
            self.top_k,
        );
        rag.index_chunks(&chunks).await?;
        let results = rag.retrieve(CONCEPTS_QUERY).await?;

        let prompt = self.template.render(&[
            ("context", &join_context(&results)),
            ("question", CONCEPTS_QUERY),
        ]);
        let reply = self.llm.complete(&prompt).await?;
        let new_stack = NewStack::from_model_output(&reply)?;

        let stack = self.store.create(&new_stack).await?;
        tracing::info!(stack_id = stack.id, cards = stack.qasets.len(), "flashcards created");
        Ok(stack)
    }

    pub async fn list(&self) -> Result<Vec<Stack>, DomainError> {
        self.store.list().await
    }

    pub async fn get(&self, id: i64) -> Result<Stack, DomainError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("stack {id}")))
    }

    #[instrument(skip(self, stack), fields(stack_id = stack.id))]
    pub async fn update(&self, stack: &Stack) -> Result<Stack, DomainError> {
        if stack.name.trim().is_empty() {
            return Err(DomainError::validation("stack name must not be empty"));
        }
        self.store
            .update(stack)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("stack {}", stack.id)))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), DomainError> {
        if self.store.delete(id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found(format!("stack {id}")))
        }
    }
}
