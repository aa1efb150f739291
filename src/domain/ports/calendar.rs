use async_trait::async_trait;

use crate::domain::{errors::DomainError, CalendarEvent, EventDraft};

/// Remote event store. Times are RFC 3339 strings as the provider expects them.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Single (expanded) events overlapping `[time_min, time_max)`, ordered by start.
    async fn list_events(
        &self,
        time_min: &str,
        time_max: &str,
    ) -> Result<Vec<CalendarEvent>, DomainError>;
    /// Inserts an event and notifies its attendees.
    async fn insert_event(&self, draft: &EventDraft) -> Result<CalendarEvent, DomainError>;
    async fn delete_event(&self, event_id: &str) -> Result<(), DomainError>;
}
