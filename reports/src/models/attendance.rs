use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// Attendance row as returned by the backend, one per employee per day.
///
/// Timestamps stay as raw strings so that one malformed value does not fail
/// the whole batch; the normalizer decides what they mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttendanceRecord {
    pub user_id: String,
    #[serde(default)]
    pub employee_code: String,
    #[serde(default)]
    pub employee_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub role: String,
    pub work_date: String,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub check_in_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub check_out_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: Option<AttendanceStatus>,
}

/// Keeps string values; any other JSON type reads as absent.
fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text),
        Some(other) => {
            tracing::debug!(value = %other, "Treating non-string attendance field as absent");
            None
        }
    })
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<Option<AttendanceStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = deserialize_lenient_string(deserializer)?;
    Ok(raw.and_then(|value| match value.parse::<AttendanceStatus>() {
        Ok(status) => Some(status),
        Err(_) => {
            tracing::warn!(status = %value, "Ignoring unknown attendance status");
            None
        }
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
    #[serde(alias = "half_day")]
    HalfDay,
    Weekend,
    Holiday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Success,
    Danger,
    Info,
    Warning,
    Muted,
    Accent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub label: &'static str,
    pub tone: BadgeTone,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        use AttendanceStatus::*;
        match self {
            Present => "present",
            Absent => "absent",
            Leave => "leave",
            HalfDay => "half-day",
            Weekend => "weekend",
            Holiday => "holiday",
        }
    }

    pub fn label(&self) -> &'static str {
        use AttendanceStatus::*;
        match self {
            Present => "Present",
            Absent => "Absent",
            Leave => "Leave",
            HalfDay => "Half Day",
            Weekend => "Weekend",
            Holiday => "Holiday",
        }
    }

    pub fn badge(&self) -> StatusBadge {
        use AttendanceStatus::*;
        let tone = match self {
            Present => BadgeTone::Success,
            Absent => BadgeTone::Danger,
            Leave => BadgeTone::Info,
            HalfDay => BadgeTone::Warning,
            Weekend => BadgeTone::Muted,
            Holiday => BadgeTone::Accent,
        };
        StatusBadge {
            label: self.label(),
            tone,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl FromStr for AttendanceStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "leave" => Ok(AttendanceStatus::Leave),
            "half-day" | "half_day" => Ok(AttendanceStatus::HalfDay),
            "weekend" => Ok(AttendanceStatus::Weekend),
            "holiday" => Ok(AttendanceStatus::Holiday),
            _ => Err(UnknownStatus(value.to_string())),
        }
    }
}

/// Attendance row with derived hours and flags.
///
/// Only the normalizer builds these; the flags are recomputed from the
/// timestamps every time and are never read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDayRecord {
    pub user_id: String,
    pub employee_code: String,
    pub employee_name: String,
    pub department: String,
    pub role: String,
    pub work_date: NaiveDate,
    pub check_in_at: Option<NaiveDateTime>,
    pub check_out_at: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub hours: f64,
    pub late_arrival: bool,
    pub early_checkin: bool,
    pub late_checkout: bool,
    pub early_checkout: bool,
    /// Check-out earlier than check-in; `hours` is then negative.
    pub duration_anomaly: bool,
}
