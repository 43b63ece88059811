use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const TIME_ONLY_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

/// Returns the current time in the configured timezone.
pub fn now_in_timezone(tz: &Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(tz)
}

/// Returns today's date in the configured timezone.
pub fn today_local(tz: &Tz) -> NaiveDate {
    now_in_timezone(tz).date_naive()
}

/// Parses a backend timestamp into wall-clock time of the report timezone.
///
/// Offset-carrying values are converted into `tz`; naive values are taken as
/// already local. A bare time of day is placed on `work_date`.
pub fn parse_timestamp(raw: &str, work_date: NaiveDate, tz: &Tz) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(tz).naive_local());
    }
    if let Some(parsed) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(parsed);
    }
    TIME_ONLY_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
        .map(|time| work_date.and_time(time))
}

/// `09:15 AM` style clock time.
pub fn format_clock_12h(value: &NaiveDateTime) -> String {
    value.format("%I:%M %p").to_string()
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
