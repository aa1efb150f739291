use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::application::RagService;
use crate::domain::{Document, DomainError, TextSplitter};

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document: Document,
    pub chunks: usize,
}

impl IngestReport {
    pub fn message(&self) -> String {
        format!(
            "Loaded {} document chunks from {}",
            self.chunks, self.document.name
        )
    }
}

/// Splits uploaded text and indexes it for question answering.
pub struct DocumentService {
    rag: Arc<RagService>,
    splitter: TextSplitter,
}

impl DocumentService {
    pub fn new(rag: Arc<RagService>, splitter: TextSplitter) -> Self {
        Self { rag, splitter }
    }

    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn ingest(
        &self,
        name: &str,
        content_type: &str,
        text: &str,
    ) -> Result<IngestReport, DomainError> {
        let document = Document::new(name).with_content_type(content_type);
        let chunks = self.splitter.split_document(document.id, text);

        self.rag.index_chunks(&chunks).await?;
        let total = self.rag.indexed_chunks().await?;
        tracing::info!(
            document_id = %document.id,
            chunks = chunks.len(),
            total,
            "document indexed"
        );

        Ok(IngestReport {
            document,
            chunks: chunks.len(),
        })
    }
}
