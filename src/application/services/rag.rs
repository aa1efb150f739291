use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingService, LlmService, VectorStore},
    DocumentChunk, DomainError, PromptTemplate, SearchResult,
};

pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmService>,
    default_top_k: usize,
    template: PromptTemplate,
}

impl RagService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmService>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            llm,
            default_top_k,
            template: PromptTemplate::new("Context: {context}\nQuestion: {question}\nAnswer:"),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>, DomainError> {
        self.retrieve_top_k(query, self.default_top_k).await
    }

    #[instrument(skip(self))]
    pub async fn retrieve_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let embedding = self.embedding.embed(query).await?;
        self.vector_store.search(&embedding, top_k).await
    }

    /// Retrieves the best matching chunks and asks the model to answer from them.
    #[instrument(skip(self))]
    pub async fn answer(&self, question: &str) -> Result<String, DomainError> {
        let results = self.retrieve(question).await?;
        tracing::debug!(retrieved = results.len(), "context retrieved");

        let prompt = self.build_prompt(question, &results);
        self.llm.complete(&prompt).await
    }

    pub fn build_prompt(&self, question: &str, results: &[SearchResult]) -> String {
        let context = join_context(results);
        self.template
            .render(&[("context", &context), ("question", question)])
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn index_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), DomainError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedding.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(DomainError::external(format!(
                "embedding model returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let expected = self.embedding.dimension();
        if let Some(bad) = embeddings.iter().find(|e| e.dimension() != expected) {
            return Err(DomainError::external(format!(
                "embedding has {} dimensions, expected {expected}",
                bad.dimension()
            )));
        }

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            self.vector_store.upsert(chunk, embedding).await?;
        }

        Ok(())
    }

    pub async fn indexed_chunks(&self) -> Result<usize, DomainError> {
        self.vector_store.len().await
    }
}

/// Chunk texts separated by blank lines, best match first.
pub fn join_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
