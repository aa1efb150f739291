//! rig tool wrappers around [`CalendarTools`].
//!
//! Arguments arrive as raw JSON and every tool answers with text. Errors are
//! part of that text, so `CalendarToolError` is never actually produced.

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::application::services::calendar::parse_params;
use crate::application::CalendarTools;
use crate::domain::{DeleteMeetingParams, EventRangeParams, ScheduleMeetingParams};

#[derive(Debug, thiserror::Error)]
#[error("Calendar tool error: {0}")]
pub struct CalendarToolError(pub String);

#[derive(Debug, Default, Deserialize)]
struct TimezoneArgs {
    #[serde(default)]
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlotArgs {
    query: String,
}

/// `{"timezone": ...}`, a bare zone name, or nothing at all.
fn timezone_arg(args: Value) -> Option<String> {
    match args {
        Value::Null => None,
        Value::String(raw) if !raw.trim_start().starts_with('{') => Some(raw),
        other => parse_params::<TimezoneArgs>(other)
            .unwrap_or_default()
            .timezone,
    }
}

fn timezone_schema(description: &str, name: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "timezone": {
                    "type": "string",
                    "description": "IANA timezone name, e.g. America/New_York"
                }
            }
        }),
    }
}

pub struct GetCurrentDay(pub Arc<CalendarTools>);

impl Tool for GetCurrentDay {
    const NAME: &'static str = "get_current_day";

    type Error = CalendarToolError;
    type Args = Value;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        timezone_schema(
            "Get today's weekday, full date and local time in a timezone.",
            Self::NAME,
        )
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        tracing::debug!(tool = Self::NAME, "tool called");
        Ok(self.0.current_day(timezone_arg(args).as_deref()))
    }
}

pub struct GetCurrentYear(pub Arc<CalendarTools>);

impl Tool for GetCurrentYear {
    const NAME: &'static str = "get_current_year";

    type Error = CalendarToolError;
    type Args = Value;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        timezone_schema("Get the current year in a timezone.", Self::NAME)
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        tracing::debug!(tool = Self::NAME, "tool called");
        Ok(self.0.current_year(timezone_arg(args).as_deref()))
    }
}

pub struct GetCurrentLocalTime(pub Arc<CalendarTools>);

impl Tool for GetCurrentLocalTime {
    const NAME: &'static str = "get_current_local_time";

    type Error = CalendarToolError;
    type Args = Value;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        timezone_schema("Get the current local time in a timezone.", Self::NAME)
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        tracing::debug!(tool = Self::NAME, "tool called");
        Ok(self.0.current_local_time(timezone_arg(args).as_deref()))
    }
}

pub struct IsSlotAvailable(pub Arc<CalendarTools>);

impl Tool for IsSlotAvailable {
    const NAME: &'static str = "is_slot_available";

    type Error = CalendarToolError;
    type Args = Value;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Check whether the user is free for 30 minutes at a time given in natural language, e.g. 'tomorrow at 3pm America/Chicago'.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The time to check, optionally followed by an IANA timezone"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        tracing::debug!(tool = Self::NAME, "tool called");
        let query = match args {
            Value::String(raw) if !raw.trim_start().starts_with('{') => raw,
            other => match parse_params::<SlotArgs>(other) {
                Ok(args) => args.query,
                Err(message) => return Ok(message),
            },
        };
        Ok(self.0.is_slot_available(&query).await)
    }
}

pub struct ScheduleMeeting(pub Arc<CalendarTools>);

impl Tool for ScheduleMeeting {
    const NAME: &'static str = "schedule_meeting";

    type Error = CalendarToolError;
    type Args = Value;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Create a calendar event and invite attendees. end_time defaults to one hour after start_time.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "start_time": { "type": "string", "description": "ISO 8601 start" },
                    "end_time": { "type": "string", "description": "ISO 8601 end" },
                    "timezone": { "type": "string", "description": "IANA timezone name" },
                    "event_title": { "type": "string" },
                    "description": { "type": "string" },
                    "attendees_list": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Attendee email addresses"
                    },
                    "location": { "type": "string" },
                    "conference_link": { "type": "string" }
                },
                "required": ["start_time", "event_title"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        tracing::debug!(tool = Self::NAME, "tool called");
        match parse_params::<ScheduleMeetingParams>(args) {
            Ok(params) => Ok(self.0.schedule_meeting(params).await),
            Err(message) => Ok(message),
        }
    }
}

pub struct DeleteMeeting(pub Arc<CalendarTools>);

impl Tool for DeleteMeeting {
    const NAME: &'static str = "delete_meeting";

    type Error = CalendarToolError;
    type Args = Value;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Delete the event with the given title starting at start_time.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "start_time": { "type": "string", "description": "ISO 8601 start" },
                    "timezone": { "type": "string", "description": "IANA timezone name" },
                    "event_title": { "type": "string" }
                },
                "required": ["start_time", "event_title"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        tracing::debug!(tool = Self::NAME, "tool called");
        match parse_params::<DeleteMeetingParams>(args) {
            Ok(params) => Ok(self.0.delete_meeting(params).await),
            Err(message) => Ok(message),
        }
    }
}

pub struct GetCalendarEvents(pub Arc<CalendarTools>);

impl Tool for GetCalendarEvents {
    const NAME: &'static str = "get_calendar_events";

    type Error = CalendarToolError;
    type Args = Value;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "List events between start_time and end_time with their attendees, location and conference link.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "start_time": { "type": "string", "description": "ISO 8601 range start" },
                    "end_time": { "type": "string", "description": "ISO 8601 range end" },
                    "timezone": { "type": "string", "description": "IANA timezone name" }
                },
                "required": ["start_time", "end_time"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        tracing::debug!(tool = Self::NAME, "tool called");
        match parse_params::<EventRangeParams>(args) {
            Ok(params) => Ok(self.0.get_calendar_events(params).await),
            Err(message) => Ok(message),
        }
    }
}

/// The fixed set of calendar tools, all sharing one [`CalendarTools`].
pub fn calendar_toolset(
    tools: Arc<CalendarTools>,
) -> (
    GetCurrentDay,
    GetCurrentYear,
    GetCurrentLocalTime,
    IsSlotAvailable,
    ScheduleMeeting,
    DeleteMeeting,
    GetCalendarEvents,
) {
    (
        GetCurrentDay(tools.clone()),
        GetCurrentYear(tools.clone()),
        GetCurrentLocalTime(tools.clone()),
        IsSlotAvailable(tools.clone()),
        ScheduleMeeting(tools.clone()),
        DeleteMeeting(tools.clone()),
        GetCalendarEvents(tools),
    )
}
