mod google;

pub use google::GoogleCalendarClient;
