//! Application layer - Use cases and orchestration.
//!
//! Services here sequence calls to domain ports (traits); the hosted models,
//! calendar provider and databases sit behind those ports.

pub mod services;

pub use services::{
    CalendarAssistant, CalendarTools, DocumentService, FlashcardService, IngestReport, RagService,
    StudyAction, StudyInstructions, StudyOutcome, StudyService,
};
