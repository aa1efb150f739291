pub mod calendar;
pub mod document;
pub mod flashcards;
pub mod rag;
pub mod study;

#[cfg(test)]
pub(crate) mod testing;

pub use calendar::{CalendarAssistant, CalendarTools};
pub use document::{DocumentService, IngestReport};
pub use flashcards::FlashcardService;
pub use rag::RagService;
pub use study::{StudyAction, StudyInstructions, StudyOutcome, StudyService};
