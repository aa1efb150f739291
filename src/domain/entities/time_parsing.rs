//! Date and time helpers for the calendar tools.
//!
//! The agent hands tools either ISO 8601 strings or free text such as
//! "Am I available at 7:30 pm tomorrow America/Chicago?". Everything here is
//! pure: callers pass `now` in so results are reproducible.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Weekday,
};
use chrono_tz::Tz;

/// `Thursday, July 03, 2025 at 07:00 PM`
pub const LONG_FORMAT: &str = "%A, %B %d, %Y at %I:%M %p";

const TIMEZONE_PREFIXES: [&str; 5] = ["America", "Europe", "Asia", "Africa", "Australia"];
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn trim_token(token: &str) -> &str {
    token
        .trim_start_matches(['(', '"', '\''])
        .trim_end_matches(['.', ',', '?', '!', ';', ')', '"', '\''])
}

/// First IANA zone named in free text, e.g. `Europe/Berlin`.
pub fn detect_timezone(input: &str) -> Option<Tz> {
    input.split_whitespace().find_map(|raw| {
        let token = trim_token(raw);
        let candidate = token.contains('/')
            && TIMEZONE_PREFIXES.iter().any(|p| token.starts_with(p));
        if candidate {
            token.parse::<Tz>().ok()
        } else {
            None
        }
    })
}

/// Parses an ISO 8601 date-time. Strings with an offset keep their instant;
/// naive ones are read as wall-clock time in `tz`; bare dates become midnight.
pub fn parse_iso_in(raw: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(tz));
    }
    if let Some(naive) = parse_naive(raw) {
        return tz.from_local_datetime(&naive).earliest();
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN)).earliest()
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
}

/// Formats a provider timestamp in `tz` with [`LONG_FORMAT`], or returns the
/// raw string when it cannot be parsed.
pub fn format_long(raw: &str, tz: &Tz) -> String {
    parse_iso_in(raw, tz)
        .map(|dt| dt.format(LONG_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Resolves a natural-language time relative to `now`.
///
/// Understands a full ISO date-time anywhere in the text, or a date part
/// combined with a clock time (`7pm`, `7:30 pm`, `19:00`, `noon`,
/// `midnight`). Date parts are `today`, `tonight`, `tomorrow`, a weekday,
/// `next <weekday>`, `YYYY-MM-DD`, `M/D[/YYYY]` and month names
/// (`July 10`, `10 Jul 2026`). Without a date part the day is today.
///
/// Returns `None` when no clock time is present, or when something that
/// looks like a date cannot be resolved.
pub fn parse_time_phrase(input: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let tokens: Vec<String> = input
        .split_whitespace()
        .map(|t| trim_token(t).to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if let Some(dt) = tokens.iter().find_map(|t| {
        if t.contains('T') && t.contains(':') {
            parse_iso_in(t, &tz)
        } else {
            None
        }
    }) {
        return Some(dt);
    }

    let lower: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
    let date = resolve_date(&lower, now.date_naive())?;
    let time = resolve_clock(&lower, &date.used)?;

    tz.from_local_datetime(&date.day.and_time(time)).earliest()
}

/// Day named in the text and the token positions it came from.
struct DatePart {
    day: NaiveDate,
    used: Vec<usize>,
}

fn resolve_date(tokens: &[String], today: NaiveDate) -> Option<DatePart> {
    for (i, token) in tokens.iter().enumerate() {
        let single = |day: NaiveDate| Some(DatePart { day, used: vec![i] });

        match token.as_str() {
            "today" | "tonight" => return single(today),
            "tomorrow" => return single(today.succ_opt()?),
            _ => {}
        }
        if is_iso_date(token) {
            return single(NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()?);
        }
        if is_numeric_date(token) {
            return single(numeric_date(token, today)?);
        }
        if token == "next" {
            if let Some(weekday) = tokens.get(i + 1).and_then(|t| parse_weekday(t)) {
                let ahead = match days_until(today, weekday) {
                    0 => 7,
                    n => n,
                };
                let day = today.checked_add_signed(Duration::days(ahead))?;
                return Some(DatePart { day, used: vec![i, i + 1] });
            }
            continue;
        }
        if let Some(weekday) = parse_weekday(token) {
            let ahead = days_until(today, weekday);
            return single(today.checked_add_signed(Duration::days(ahead))?);
        }
        if let Some(day) = parse_day(token) {
            if let Some(month) = tokens.get(i + 1).and_then(|t| parse_month(t)) {
                let year = tokens.get(i + 2).and_then(|t| parse_year(t));
                let mut used = vec![i, i + 1];
                used.extend(year.map(|_| i + 2));
                let day = upcoming(month, day, year, today)?;
                return Some(DatePart { day, used });
            }
        }
        if let Some(month) = parse_month(token) {
            let Some(day) = tokens.get(i + 1).and_then(|t| parse_day(t)) else {
                // "may" is usually the verb
                if token == "may" {
                    continue;
                }
                return None;
            };
            let year = tokens.get(i + 2).and_then(|t| parse_year(t));
            let mut used = vec![i, i + 1];
            used.extend(year.map(|_| i + 2));
            let day = upcoming(month, day, year, today)?;
            return Some(DatePart { day, used });
        }
    }
    Some(DatePart {
        day: today,
        used: Vec::new(),
    })
}

fn days_until(today: NaiveDate, weekday: Weekday) -> i64 {
    (7 + weekday.num_days_from_monday() as i64 - today.weekday().num_days_from_monday() as i64)
        % 7
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_iso_date(token: &str) -> bool {
    let parts: Vec<&str> = token.split('-').collect();
    parts.len() == 3 && parts.iter().all(|p| is_digits(p)) && parts[0].len() == 4
}

fn is_numeric_date(token: &str) -> bool {
    let parts: Vec<&str> = token.split('/').collect();
    (2..=3).contains(&parts.len()) && parts.iter().all(|p| is_digits(p))
}

/// `M/D` or `M/D/YYYY`; a two-digit year is read as 20YY.
fn numeric_date(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let mut parts = token.split('/');
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let year = match parts.next() {
        Some(y) if y.len() == 2 => Some(2000 + y.parse::<i32>().ok()?),
        Some(y) => Some(y.parse().ok()?),
        None => None,
    };
    upcoming(month, day, year, today)
}

/// The given month and day in `year`, or the next one on or after `today`.
fn upcoming(month: u32, day: u32, year: Option<i32>, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(year) = year {
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year >= today {
        Some(this_year)
    } else {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    }
}

fn parse_month(token: &str) -> Option<u32> {
    let month = match token {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Day of month, with an optional ordinal suffix (`10th`).
fn parse_day(token: &str) -> Option<u32> {
    let number = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
        .unwrap_or(token);
    if number.len() > 2 || !is_digits(number) {
        return None;
    }
    number.parse().ok().filter(|d| (1..=31).contains(d))
}

fn parse_year(token: &str) -> Option<i32> {
    if token.len() == 4 && is_digits(token) {
        token.parse().ok()
    } else {
        None
    }
}

fn parse_weekday(token: &str) -> Option<Weekday> {
    match token.trim_end_matches("'s") {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Meridiem {
    Am,
    Pm,
}

fn parse_meridiem(token: &str) -> Option<Meridiem> {
    match token {
        "am" | "a.m" | "a.m." => Some(Meridiem::Am),
        "pm" | "p.m" | "p.m." => Some(Meridiem::Pm),
        _ => None,
    }
}

fn split_meridiem(token: &str) -> (&str, Option<Meridiem>) {
    for suffix in ["a.m.", "p.m.", "a.m", "p.m", "am", "pm"] {
        if let Some(number) = token.strip_suffix(suffix) {
            if !number.is_empty() {
                return (number, parse_meridiem(suffix));
            }
        }
    }
    (token, None)
}

fn resolve_clock(tokens: &[String], skip: &[usize]) -> Option<NaiveTime> {
    for (i, token) in tokens.iter().enumerate() {
        if skip.contains(&i) {
            continue;
        }
        match token.as_str() {
            "noon" | "midday" => return NaiveTime::from_hms_opt(12, 0, 0),
            "midnight" => return NaiveTime::from_hms_opt(0, 0, 0),
            _ => {}
        }

        let (number, mut meridiem) = split_meridiem(token);
        if meridiem.is_none() {
            meridiem = tokens.get(i + 1).and_then(|next| parse_meridiem(next));
        }
        if meridiem.is_none() && !number.contains(':') {
            continue;
        }
        if let Some(time) = clock_from_parts(number, meridiem) {
            return Some(time);
        }
    }
    None
}

fn clock_from_parts(number: &str, meridiem: Option<Meridiem>) -> Option<NaiveTime> {
    let mut parts = number.split(':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    let second: u32 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }

    let hour = match meridiem {
        Some(_) if !(1..=12).contains(&hour) => return None,
        Some(Meridiem::Am) => hour % 12,
        Some(Meridiem::Pm) => hour % 12 + 12,
        None => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, second)
}
