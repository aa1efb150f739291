mod calendar;
mod conversation;
mod document;
mod embedding;
mod flashcard;
mod prompt;
pub mod time_parsing;

pub use calendar::{
    Attendee, CalendarEvent, ConferenceData, DeleteMeetingParams, EntryPoint, EventDraft,
    EventRangeParams, EventTime, ScheduleMeetingParams,
};
pub use conversation::{prompt_with_history, Message, MessageRole};
pub use document::{Document, DocumentChunk, SearchResult, TextSplitter};
pub use embedding::Embedding;
pub use flashcard::{NewQaSet, NewStack, QaSet, Stack};
pub use prompt::PromptTemplate;
