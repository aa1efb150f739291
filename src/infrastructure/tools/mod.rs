mod calendar;

pub use calendar::{
    calendar_toolset, CalendarToolError, DeleteMeeting, GetCalendarEvents, GetCurrentDay,
    GetCurrentLocalTime, GetCurrentYear, IsSlotAvailable, ScheduleMeeting,
};
