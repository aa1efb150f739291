use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::domain::time_parsing::{
    detect_timezone, format_long, parse_iso_in, parse_time_phrase,
};
use crate::domain::{
    ports::{CalendarApi, ToolAgent},
    Attendee, DeleteMeetingParams, DomainError, EventDraft, EventRangeParams, EventTime,
    ScheduleMeetingParams,
};

pub const PARSE_ERROR: &str = "Error: could not parse JSON input.";

const SLOT_MINUTES: i64 = 30;
const DELETE_WINDOW_MINUTES: i64 = 90;

/// Decodes tool arguments. Models sometimes send the JSON object itself and
/// sometimes a string containing it; both are accepted.
pub fn parse_params<T: DeserializeOwned>(input: serde_json::Value) -> Result<T, String> {
    let value = match input {
        serde_json::Value::String(raw) => {
            serde_json::from_str(&raw).map_err(|_| PARSE_ERROR.to_string())?
        }
        other => other,
    };
    serde_json::from_value(value).map_err(|_| PARSE_ERROR.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedEvent {
    pub title: String,
    pub start: String,
    pub end: String,
    pub attendees: Vec<String>,
    pub conference_link: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// The fixed calendar operations exposed to the agent.
///
/// Every operation returns text for the model. Provider failures are
/// reported in that text instead of being raised, so a failing call never
/// aborts the agent's turn.
pub struct CalendarTools {
    api: Arc<dyn CalendarApi>,
    default_tz: Tz,
}

impl CalendarTools {
    pub fn new(api: Arc<dyn CalendarApi>, default_tz: Tz) -> Self {
        Self { api, default_tz }
    }

    fn zone(&self, name: Option<&str>) -> Tz {
        name.and_then(|n| n.trim().parse::<Tz>().ok())
            .unwrap_or(self.default_tz)
    }

    pub fn current_day(&self, timezone: Option<&str>) -> String {
        current_day_at(Utc::now(), self.zone(timezone))
    }

    pub fn current_year(&self, timezone: Option<&str>) -> String {
        current_year_at(Utc::now(), self.zone(timezone))
    }

    pub fn current_local_time(&self, timezone: Option<&str>) -> String {
        current_local_time_at(Utc::now(), self.zone(timezone))
    }

    pub async fn is_slot_available(&self, query: &str) -> String {
        self.is_slot_available_at(query, Utc::now()).await
    }

    #[instrument(skip(self, now))]
    pub async fn is_slot_available_at(&self, query: &str, now: DateTime<Utc>) -> String {
        let tz = detect_timezone(query).unwrap_or(self.default_tz);
        let Some(start) = parse_time_phrase(query, now.with_timezone(&tz)) else {
            return format!("Sorry, I couldn't understand the time in '{query}'.");
        };
        let end = start + Duration::minutes(SLOT_MINUTES);
        let at = start.format("%I:%M %p");

        let events = match self
            .api
            .list_events(&start.to_rfc3339(), &end.to_rfc3339())
            .await
        {
            Ok(events) => events,
            Err(e) => return format!("Calendar error: {e}"),
        };

        let Some(first) = events.first() else {
            return format!("You are available at {at} ({}).", tz.name());
        };

        let starts = first
            .start
            .as_ref()
            .and_then(|t| t.raw())
            .map(|raw| format_long(raw, &tz))
            .unwrap_or_default();
        let ends = first
            .end
            .as_ref()
            .and_then(|t| t.raw())
            .map(|raw| format_long(raw, &tz))
            .unwrap_or_default();

        format!(
            "You are NOT available at {at} ({}). {} event(s) found. Scheduling conflict with the event: {}. The event starts at {starts} and ends at {ends}",
            tz.name(),
            events.len(),
            first.summary.as_deref().unwrap_or("No title"),
        )
    }

    #[instrument(skip(self, params))]
    pub async fn schedule_meeting(&self, params: ScheduleMeetingParams) -> String {
        let start = params.start_time.filter(|s| !s.trim().is_empty());
        let title = params.event_title.filter(|s| !s.trim().is_empty());
        let (Some(start), Some(title)) = (start, title) else {
            return "Error: start_time, end_time, and event_title are required.".to_string();
        };

        let tz = self.zone(params.timezone.as_deref());
        let Some(start_at) = parse_iso_in(&start, &tz) else {
            return format!("Error: could not parse start_time '{start}'.");
        };
        let end_at = match params.end_time.filter(|s| !s.trim().is_empty()) {
            Some(end) => match parse_iso_in(&end, &tz) {
                Some(end_at) => end_at,
                None => return format!("Error: could not parse end_time '{end}'."),
            },
            None => start_at + Duration::hours(1),
        };

        let timezone = tz.name().to_string();
        let description = params.description.unwrap_or_default();
        let description = match params.conference_link.filter(|l| !l.trim().is_empty()) {
            Some(link) => format!("{description} | Link: {link}"),
            None => description,
        };

        let draft = EventDraft {
            summary: title.clone(),
            start: EventTime::at(start_at.to_rfc3339(), timezone.clone()),
            end: EventTime::at(end_at.to_rfc3339(), timezone),
            attendees: params
                .attendees_list
                .into_iter()
                .map(|email| Attendee { email: Some(email) })
                .collect(),
            location: params.location.unwrap_or_default(),
            description,
        };

        match self.api.insert_event(&draft).await {
            Ok(created) => {
                tracing::info!(event_id = ?created.id, "event created");
                format!(
                    "Meeting '{title}' scheduled: {}",
                    created.html_link.unwrap_or_default()
                )
            }
            Err(e) => format!("Calendar error: {e}"),
        }
    }

    #[instrument(skip(self, params))]
    pub async fn delete_meeting(&self, params: DeleteMeetingParams) -> String {
        let start = params.start_time.filter(|s| !s.trim().is_empty());
        let title = params.event_title.filter(|s| !s.trim().is_empty());
        let (Some(start), Some(title)) = (start, title) else {
            return "Error: start_time and event_title are required.".to_string();
        };

        let tz = self.zone(params.timezone.as_deref());
        let Some(window_start) = parse_iso_in(&start, &tz) else {
            return format!("Error: could not parse start_time '{start}'.");
        };
        let window_end = window_start + Duration::minutes(DELETE_WINDOW_MINUTES);

        let events = match self
            .api
            .list_events(&window_start.to_rfc3339(), &window_end.to_rfc3339())
            .await
        {
            Ok(events) => events,
            Err(e) => return format!("Calendar error: {e}"),
        };

        let wanted = title.to_lowercase();
        let matching = events.iter().find(|event| {
            event.id.is_some()
                && event
                    .summary
                    .as_deref()
                    .is_some_and(|s| s.to_lowercase() == wanted)
        });

        match matching.and_then(|e| e.id.as_deref()) {
            Some(event_id) => match self.api.delete_event(event_id).await {
                Ok(()) => {
                    tracing::info!(event_id, "event deleted");
                    format!("Meeting '{title}' at {start} was deleted.")
                }
                Err(e) => format!("Error deleting event: {e}"),
            },
            None => format!("No matching event found for '{title}' at {start}."),
        }
    }

    #[instrument(skip(self, params))]
    pub async fn get_calendar_events(&self, params: EventRangeParams) -> String {
        let tz = self.zone(params.timezone.as_deref());
        let time_min = to_rfc3339_in(&params.start_time, &tz);
        let time_max = to_rfc3339_in(&params.end_time, &tz);

        let events = match self.api.list_events(&time_min, &time_max).await {
            Ok(events) => events,
            Err(e) => return format!("Error fetching events: {e}"),
        };

        if events.is_empty() {
            return "No events found in that time range.".to_string();
        }

        let formatted: Vec<FormattedEvent> = events
            .iter()
            .map(|event| FormattedEvent {
                title: event
                    .summary
                    .clone()
                    .unwrap_or_else(|| "No title".to_string()),
                start: event
                    .start
                    .as_ref()
                    .and_then(|t| t.raw())
                    .map(|raw| format_long(raw, &tz))
                    .unwrap_or_default(),
                end: event
                    .end
                    .as_ref()
                    .and_then(|t| t.raw())
                    .map(|raw| format_long(raw, &tz))
                    .unwrap_or_default(),
                attendees: event.attendee_emails(),
                conference_link: event.conference_link().map(str::to_string),
                location: event.location.clone(),
                description: event.description.clone(),
            })
            .collect();

        serde_json::json!({ "events": formatted }).to_string()
    }
}

fn to_rfc3339_in(raw: &str, tz: &Tz) -> String {
    parse_iso_in(raw, tz)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| raw.to_string())
}

pub fn current_day_at(now: DateTime<Utc>, tz: Tz) -> String {
    let local = now.with_timezone(&tz);
    format!(
        "Today is {}, current local time: {}",
        local.format("%A, %B %d, %Y at %I:%M %p"),
        local.format("%H:%M:%S")
    )
}

pub fn current_year_at(now: DateTime<Utc>, tz: Tz) -> String {
    format!("The current year is {}", now.with_timezone(&tz).format("%Y"))
}

pub fn current_local_time_at(now: DateTime<Utc>, tz: Tz) -> String {
    format!(
        "The current local time is {}",
        now.with_timezone(&tz).format("%H:%M:%S")
    )
}

/// Augments a calendar question with the current date and timezone and hands
/// it to the tool-calling agent.
pub struct CalendarAssistant {
    agent: Arc<dyn ToolAgent>,
    timezone: Tz,
}

impl CalendarAssistant {
    pub fn new(agent: Arc<dyn ToolAgent>, timezone: Tz) -> Self {
        Self { agent, timezone }
    }

    pub fn build_prompt(&self, question: &str, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.timezone);
        format!(
            "Question: {}. Additional information: timezone: {}, the current date: {}.",
            question.trim(),
            self.timezone.name(),
            local.format("%Y-%m-%d %H:%M:%S%:z")
        )
    }

    #[instrument(skip(self))]
    pub async fn ask(&self, question: &str) -> Result<String, DomainError> {
        if question.trim().is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }
        let prompt = self.build_prompt(question, Utc::now());
        self.agent.run(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CalendarEvent;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCalendar {
        events: Vec<CalendarEvent>,
        fail: bool,
        listed: Mutex<Vec<(String, String)>>,
        inserted: Mutex<Vec<EventDraft>>,
        deleted: Mutex<Vec<String>>,
    }

    impl RecordingCalendar {
        fn with_events(events: Vec<CalendarEvent>) -> Self {
            Self {
                events,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl CalendarApi for RecordingCalendar {
        async fn list_events(
            &self,
            time_min: &str,
            time_max: &str,
        ) -> Result<Vec<CalendarEvent>, DomainError> {
            if self.fail {
                return Err(DomainError::external("calendar unavailable"));
            }
            self.listed
                .lock()
                .unwrap()
                .push((time_min.to_string(), time_max.to_string()));
            Ok(self.events.clone())
        }

        async fn insert_event(&self, draft: &EventDraft) -> Result<CalendarEvent, DomainError> {
            if self.fail {
                return Err(DomainError::external("calendar unavailable"));
            }
            self.inserted.lock().unwrap().push(draft.clone());
            Ok(CalendarEvent {
                id: Some("new-id".into()),
                html_link: Some("https://calendar.google.com/event?eid=new".into()),
                ..Default::default()
            })
        }

        async fn delete_event(&self, event_id: &str) -> Result<(), DomainError> {
            self.deleted.lock().unwrap().push(event_id.to_string());
            Ok(())
        }
    }

    fn event(id: &str, summary: &str, start: &str, end: &str) -> CalendarEvent {
        serde_json::from_value(json!({
            "id": id,
            "summary": summary,
            "start": {"dateTime": start},
            "end": {"dateTime": end},
        }))
        .unwrap()
    }

    fn tools(calendar: Arc<RecordingCalendar>) -> CalendarTools {
        CalendarTools::new(calendar, New_York)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 3, 13, 15, 0).unwrap()
    }

    #[test]
    fn test_parse_params_object_and_string() {
        let from_object: EventRangeParams = parse_params(json!({
            "start_time": "2025-07-03T09:00:00-04:00",
            "end_time": "2025-07-04T09:00:00-04:00"
        }))
        .unwrap();
        assert_eq!(from_object.end_time, "2025-07-04T09:00:00-04:00");

        let from_string: DeleteMeetingParams = parse_params(json!(
            r#"{"start_time": "2025-07-03T09:00:00", "event_title": "Movie"}"#
        ))
        .unwrap();
        assert_eq!(from_string.event_title.as_deref(), Some("Movie"));

        let err = parse_params::<EventRangeParams>(json!("not json")).unwrap_err();
        assert_eq!(err, PARSE_ERROR);
        let err = parse_params::<EventRangeParams>(json!({"start_time": 1})).unwrap_err();
        assert_eq!(err, PARSE_ERROR);
    }

    #[test]
    fn test_clock_tools() {
        assert_eq!(
            current_day_at(now(), New_York),
            "Today is Thursday, July 03, 2025 at 09:15 AM, current local time: 09:15:00"
        );
        assert_eq!(current_year_at(now(), New_York), "The current year is 2025");
        assert_eq!(
            current_local_time_at(now(), chrono_tz::Europe::London),
            "The current local time is 14:15:00"
        );
    }

    #[tokio::test]
    async fn test_schedule_meeting_request_shape() {
        let calendar = Arc::new(RecordingCalendar::default());
        let params: ScheduleMeetingParams = parse_params(json!({
            "start_time": "2025-07-03T09:00:00-04:00",
            "timezone": "America/New_York",
            "event_title": "Meeting with Jenny",
            "description": "Brainstorming ideas",
            "attendees_list": "john@outlook.com, jane@gmail.com",
            "location": "campus",
            "conference_link": "https://meet.google.com/abc-defg-hij"
        }))
        .unwrap();

        let reply = tools(calendar.clone()).schedule_meeting(params).await;

        assert_eq!(
            reply,
            "Meeting 'Meeting with Jenny' scheduled: https://calendar.google.com/event?eid=new"
        );
        let inserted = calendar.inserted.lock().unwrap();
        let body = serde_json::to_value(&inserted[0]).unwrap();
        assert_eq!(
            body,
            json!({
                "summary": "Meeting with Jenny",
                "start": {"dateTime": "2025-07-03T09:00:00-04:00", "timeZone": "America/New_York"},
                "end": {"dateTime": "2025-07-03T10:00:00-04:00", "timeZone": "America/New_York"},
                "attendees": [{"email": "john@outlook.com"}, {"email": "jane@gmail.com"}],
                "location": "campus",
                "description": "Brainstorming ideas | Link: https://meet.google.com/abc-defg-hij"
            })
        );
    }

    #[tokio::test]
    async fn test_schedule_meeting_localises_naive_times() {
        let calendar = Arc::new(RecordingCalendar::default());
        let params = ScheduleMeetingParams {
            start_time: Some("2025-07-03T09:00".into()),
            end_time: Some("2025-07-03 10:30".into()),
            timezone: Some("Europe/Berlin".into()),
            event_title: Some("Revision".into()),
            ..Default::default()
        };

        tools(calendar.clone()).schedule_meeting(params).await;

        let inserted = calendar.inserted.lock().unwrap();
        let start = &inserted[0].start;
        assert_eq!(start.date_time.as_deref(), Some("2025-07-03T09:00:00+02:00"));
        assert_eq!(start.time_zone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(
            inserted[0].end.date_time.as_deref(),
            Some("2025-07-03T10:30:00+02:00")
        );
    }

    #[tokio::test]
    async fn test_schedule_meeting_rejects_unparseable_times() {
        let calendar = Arc::new(RecordingCalendar::default());
        let params = ScheduleMeetingParams {
            start_time: Some("tomorrow morning".into()),
            event_title: Some("Revision".into()),
            ..Default::default()
        };

        let reply = tools(calendar.clone()).schedule_meeting(params).await;

        assert_eq!(reply, "Error: could not parse start_time 'tomorrow morning'.");
        assert!(calendar.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_meeting_requires_title() {
        let calendar = Arc::new(RecordingCalendar::default());
        let params = ScheduleMeetingParams {
            start_time: Some("2025-07-03T09:00:00-04:00".into()),
            ..Default::default()
        };

        let reply = tools(calendar.clone()).schedule_meeting(params).await;

        assert_eq!(reply, "Error: start_time, end_time, and event_title are required.");
        assert!(calendar.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_meeting_reports_provider_error() {
        let calendar = Arc::new(RecordingCalendar {
            fail: true,
            ..Default::default()
        });
        let params = ScheduleMeetingParams {
            start_time: Some("2025-07-03T09:00:00-04:00".into()),
            end_time: Some("2025-07-03T11:00:00-04:00".into()),
            event_title: Some("Study".into()),
            ..Default::default()
        };

        let reply = tools(calendar).schedule_meeting(params).await;
        assert_eq!(reply, "Calendar error: External service error: calendar unavailable");
    }

    #[tokio::test]
    async fn test_delete_meeting_matches_title_case_insensitively() {
        let calendar = Arc::new(RecordingCalendar::with_events(vec![
            event("a", "Lunch", "2025-07-03T12:00:00-04:00", "2025-07-03T13:00:00-04:00"),
            event("b", "movie", "2025-07-03T12:30:00-04:00", "2025-07-03T14:00:00-04:00"),
        ]));
        let params = DeleteMeetingParams {
            start_time: Some("2025-07-03T12:00:00".into()),
            timezone: Some("America/New_York".into()),
            event_title: Some("Movie".into()),
        };

        let reply = tools(calendar.clone()).delete_meeting(params).await;

        assert_eq!(reply, "Meeting 'Movie' at 2025-07-03T12:00:00 was deleted.");
        assert_eq!(*calendar.deleted.lock().unwrap(), vec!["b".to_string()]);
        assert_eq!(
            calendar.listed.lock().unwrap()[0],
            (
                "2025-07-03T12:00:00-04:00".to_string(),
                "2025-07-03T13:30:00-04:00".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_delete_meeting_without_match() {
        let calendar = Arc::new(RecordingCalendar::with_events(vec![event(
            "a",
            "Lunch",
            "2025-07-03T12:00:00-04:00",
            "2025-07-03T13:00:00-04:00",
        )]));
        let params = DeleteMeetingParams {
            start_time: Some("2025-07-03T12:00:00-04:00".into()),
            timezone: None,
            event_title: Some("Dentist".into()),
        };

        let reply = tools(calendar.clone()).delete_meeting(params).await;

        assert_eq!(
            reply,
            "No matching event found for 'Dentist' at 2025-07-03T12:00:00-04:00."
        );
        assert!(calendar.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_calendar_events_formats_in_timezone() {
        let mut movie = event(
            "a",
            "Movie with friends",
            "2025-07-03T23:00:00Z",
            "2025-07-04T01:00:00Z",
        );
        movie.location = Some("Cinema".into());
        let calendar = Arc::new(RecordingCalendar::with_events(vec![movie]));
        let params: EventRangeParams = parse_params(json!({
            "start_time": "2025-07-03T00:00:00",
            "end_time": "2025-07-04T00:00:00",
            "timezone": "America/New_York"
        }))
        .unwrap();

        let reply = tools(calendar.clone()).get_calendar_events(params).await;
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();

        assert_eq!(value["events"][0]["title"], "Movie with friends");
        assert_eq!(value["events"][0]["start"], "Thursday, July 03, 2025 at 07:00 PM");
        assert_eq!(value["events"][0]["end"], "Thursday, July 03, 2025 at 09:00 PM");
        assert_eq!(value["events"][0]["location"], "Cinema");
        assert_eq!(
            calendar.listed.lock().unwrap()[0].0,
            "2025-07-03T00:00:00-04:00"
        );
    }

    #[tokio::test]
    async fn test_get_calendar_events_empty_and_failing() {
        let empty = Arc::new(RecordingCalendar::default());
        let params = EventRangeParams {
            start_time: "2025-07-03T00:00:00Z".into(),
            end_time: "2025-07-04T00:00:00Z".into(),
            timezone: None,
        };
        assert_eq!(
            tools(empty).get_calendar_events(params.clone()).await,
            "No events found in that time range."
        );

        let failing = Arc::new(RecordingCalendar {
            fail: true,
            ..Default::default()
        });
        assert!(tools(failing)
            .get_calendar_events(params)
            .await
            .starts_with("Error fetching events:"));
    }

    #[tokio::test]
    async fn test_slot_available() {
        let calendar = Arc::new(RecordingCalendar::default());
        let reply = tools(calendar.clone())
            .is_slot_available_at("Am I available at 7:30 pm?", now())
            .await;

        assert_eq!(reply, "You are available at 07:30 PM (America/New_York).");
        assert_eq!(
            calendar.listed.lock().unwrap()[0],
            (
                "2025-07-03T19:30:00-04:00".to_string(),
                "2025-07-03T20:00:00-04:00".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_slot_conflict_uses_named_timezone() {
        let calendar = Arc::new(RecordingCalendar::with_events(vec![event(
            "a",
            "Movie with friends",
            "2025-07-03T19:00:00+02:00",
            "2025-07-03T21:00:00+02:00",
        )]));
        let reply = tools(calendar)
            .is_slot_available_at("Am I free at 7pm Europe/Berlin?", now())
            .await;

        assert!(reply.starts_with("You are NOT available at 07:00 PM (Europe/Berlin)."));
        assert!(reply.contains("1 event(s) found."));
        assert!(reply.contains("Scheduling conflict with the event: Movie with friends."));
    }

    #[tokio::test]
    async fn test_slot_with_unparseable_time() {
        let calendar = Arc::new(RecordingCalendar::default());
        let reply = tools(calendar.clone())
            .is_slot_available_at("Am I free sometime?", now())
            .await;

        assert!(reply.starts_with("Sorry, I couldn't understand the time"));
        assert!(calendar.listed.lock().unwrap().is_empty());
    }

    struct PromptRecorder(Mutex<Vec<String>>);

    #[async_trait]
    impl ToolAgent for PromptRecorder {
        async fn run(&self, prompt: &str) -> Result<String, DomainError> {
            self.0.lock().unwrap().push(prompt.to_string());
            Ok("You have 2 meetings with Jen this month.".into())
        }
    }

    #[test]
    fn test_assistant_prompt() {
        let recorder = Arc::new(PromptRecorder(Mutex::new(vec![])));
        let assistant = CalendarAssistant::new(recorder, New_York);
        assert_eq!(
            assistant.build_prompt("What is on my calendar tomorrow?", now()),
            "Question: What is on my calendar tomorrow?. Additional information: \
             timezone: America/New_York, the current date: 2025-07-03 09:15:00-04:00."
        );
        assert!(assistant
            .build_prompt("  Book a study session at 5pm.  ", now())
            .starts_with("Question: Book a study session at 5pm.. Additional information:"));
    }

    #[tokio::test]
    async fn test_assistant_ask() {
        let agent = Arc::new(PromptRecorder(Mutex::new(vec![])));
        let assistant = CalendarAssistant::new(agent.clone(), New_York);

        let reply = assistant.ask("How many meetings with Jen?").await.unwrap();

        assert_eq!(reply, "You have 2 meetings with Jen this month.");
        assert!(agent.0.lock().unwrap()[0].starts_with("Question: How many meetings with Jen?."));
        assert!(assistant.ask("  ").await.is_err());
    }
}
