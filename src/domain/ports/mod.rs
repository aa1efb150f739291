mod agent;
mod calendar;
mod conversation_store;
mod embedding;
mod llm;
mod stack_store;
mod vector_store;

pub use agent::ToolAgent;
pub use calendar::CalendarApi;
pub use conversation_store::ConversationStore;
pub use embedding::EmbeddingService;
pub use llm::LlmService;
pub use stack_store::StackStore;
pub use vector_store::VectorStore;
