use sqlx::SqlitePool;
use std::sync::Arc;

use crate::application::{
    CalendarAssistant, DocumentService, FlashcardService, RagService, StudyService,
};
use crate::infrastructure::persistence::RedisPool;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub documents: Arc<DocumentService>,
    pub rag: Arc<RagService>,
    pub flashcards: Arc<FlashcardService>,
    pub study: Arc<StudyService>,
    pub calendar: Arc<CalendarAssistant>,
    pub db: SqlitePool,
    /// `None` when conversation memory is kept in process.
    pub redis_pool: Option<RedisPool>,
}
