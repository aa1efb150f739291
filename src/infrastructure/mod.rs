//! Infrastructure layer - adapters for the hosted models, storage and the
//! calendar provider, plus configuration loading.

pub mod agent;
pub mod calendar;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod llm;
pub mod persistence;
pub mod tools;
pub mod vector_store;

pub use agent::CalendarAgent;
pub use calendar::GoogleCalendarClient;
pub use config::{AppConfig, Config, ConfigError, PromptsConfig};
pub use embedding::TextEmbedding;
pub use extract::extract_text;
pub use llm::{gemini_client, GeminiLlm, GenerateContentClient};
pub use persistence::{InMemoryConversationStore, RedisConversationStore, SqliteStackStore};
pub use vector_store::InMemoryVectorStore;
