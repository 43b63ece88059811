use chrono::{NaiveDate, NaiveDateTime, Timelike};
use chrono_tz::Tz;

use crate::{
    models::{AttendanceStatus, NormalizedDayRecord, RawAttendanceRecord},
    utils::time::parse_timestamp,
};

/// Check-in at or after this hour counts as a late arrival.
pub const LATE_ARRIVAL_HOUR: u32 = 9;
/// Check-out at or after this hour counts as a late checkout.
pub const LATE_CHECKOUT_HOUR: u32 = 18;
/// Shifts shorter than this count as an early checkout.
pub const MINIMUM_SHIFT_HOURS: f64 = 8.0;

#[derive(Debug, Clone)]
pub struct Normalizer {
    time_zone: Tz,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(chrono_tz::UTC)
    }
}

impl Normalizer {
    pub fn new(time_zone: Tz) -> Self {
        Self { time_zone }
    }

    pub fn time_zone(&self) -> &Tz {
        &self.time_zone
    }

    /// Derives hours, flags and status for one row.
    ///
    /// Returns `None` only when `workDate` itself cannot be parsed, since the
    /// row then has no day to belong to.
    pub fn normalize(&self, raw: &RawAttendanceRecord) -> Option<NormalizedDayRecord> {
        let work_date = match NaiveDate::parse_from_str(raw.work_date.trim(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(err) => {
                tracing::warn!(
                    user_id = %raw.user_id,
                    work_date = %raw.work_date,
                    error = %err,
                    "Skipping attendance row with unparseable work date"
                );
                return None;
            }
        };

        let check_in_at = self.timestamp(raw, raw.check_in_at.as_deref(), work_date, "check_in");
        let check_out_at =
            self.timestamp(raw, raw.check_out_at.as_deref(), work_date, "check_out");

        let status = raw.status.unwrap_or(if check_in_at.is_some() {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        });

        let mut record = NormalizedDayRecord {
            user_id: raw.user_id.clone(),
            employee_code: raw.employee_code.clone(),
            employee_name: raw.employee_name.clone(),
            department: raw.department.clone(),
            role: raw.role.clone(),
            work_date,
            check_in_at,
            check_out_at,
            status,
            hours: 0.0,
            late_arrival: false,
            early_checkin: false,
            late_checkout: false,
            early_checkout: false,
            duration_anomaly: false,
        };

        let Some(check_in) = check_in_at else {
            return Some(record);
        };

        record.late_arrival = check_in.hour() >= LATE_ARRIVAL_HOUR;
        record.early_checkin = check_in.hour() < LATE_ARRIVAL_HOUR;

        if let Some(check_out) = check_out_at {
            let worked = (check_out - check_in).num_seconds() as f64 / 3600.0;
            record.hours = round_to_tenth(worked);
            record.late_checkout = check_out.hour() >= LATE_CHECKOUT_HOUR;
            record.early_checkout = worked < MINIMUM_SHIFT_HOURS;
            if check_out < check_in {
                record.duration_anomaly = true;
                tracing::warn!(
                    user_id = %raw.user_id,
                    work_date = %work_date,
                    hours = record.hours,
                    "Check-out precedes check-in; keeping negative duration"
                );
            }
        }

        Some(record)
    }

    /// Normalizes a batch, dropping rows without a usable work date.
    pub fn normalize_all<'a, I>(&self, rows: I) -> Vec<NormalizedDayRecord>
    where
        I: IntoIterator<Item = &'a RawAttendanceRecord>,
    {
        rows.into_iter()
            .filter_map(|raw| self.normalize(raw))
            .collect()
    }

    fn timestamp(
        &self,
        raw: &RawAttendanceRecord,
        value: Option<&str>,
        work_date: NaiveDate,
        field: &'static str,
    ) -> Option<NaiveDateTime> {
        let value = value?;
        let parsed = parse_timestamp(value, work_date, &self.time_zone);
        if parsed.is_none() && !value.trim().is_empty() {
            tracing::debug!(
                user_id = %raw.user_id,
                field,
                value,
                "Treating malformed timestamp as absent"
            );
        }
        parsed
    }
}

fn round_to_tenth(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(check_in: Option<&str>, check_out: Option<&str>) -> RawAttendanceRecord {
        RawAttendanceRecord {
            user_id: "u1".into(),
            employee_code: "E001".into(),
            employee_name: "Jane Roe".into(),
            department: "Ops".into(),
            role: "employee".into(),
            work_date: "2025-11-03".into(),
            check_in_at: check_in.map(str::to_owned),
            check_out_at: check_out.map(str::to_owned),
            status: None,
        }
    }

    #[test]
    fn short_late_shift_sets_expected_flags() {
        let record = Normalizer::default()
            .normalize(&raw(Some("2025-11-03T09:15:00"), Some("2025-11-03T17:00:00")))
            .unwrap();
        assert_eq!(record.hours, 7.8);
        assert!(record.late_arrival);
        assert!(!record.early_checkin);
        assert!(record.early_checkout);
        assert!(!record.late_checkout);
        assert_eq!(record.status, AttendanceStatus::Present);
    }

    #[test]
    fn early_long_shift_sets_expected_flags() {
        let record = Normalizer::default()
            .normalize(&raw(Some("2025-11-03T08:50:00"), Some("2025-11-03T18:10:00")))
            .unwrap();
        assert_eq!(record.hours, 9.3);
        assert!(!record.late_arrival);
        assert!(record.early_checkin);
        assert!(record.late_checkout);
        assert!(!record.early_checkout);
    }

    #[test]
    fn missing_check_in_clears_everything() {
        let record = Normalizer::default()
            .normalize(&raw(None, Some("2025-11-03T19:00:00")))
            .unwrap();
        assert_eq!(record.hours, 0.0);
        assert!(!record.late_arrival && !record.early_checkin);
        assert!(!record.late_checkout && !record.early_checkout);
        assert_eq!(record.status, AttendanceStatus::Absent);
    }

    #[test]
    fn open_shift_has_arrival_flags_but_no_hours() {
        let record = Normalizer::default()
            .normalize(&raw(Some("2025-11-03T10:00:00"), None))
            .unwrap();
        assert_eq!(record.hours, 0.0);
        assert!(record.late_arrival);
        assert!(!record.early_checkout);
        assert!(!record.late_checkout);
    }

    #[test]
    fn malformed_check_in_is_treated_as_absent() {
        let record = Normalizer::default()
            .normalize(&raw(Some("yesterday-ish"), Some("2025-11-03T17:00:00")))
            .unwrap();
        assert!(record.check_in_at.is_none());
        assert_eq!(record.hours, 0.0);
        assert_eq!(record.status, AttendanceStatus::Absent);
    }

    #[test]
    fn server_status_wins_over_inference() {
        let mut row = raw(Some("2025-11-03T09:00:00"), Some("2025-11-03T13:00:00"));
        row.status = Some(AttendanceStatus::HalfDay);
        let record = Normalizer::default().normalize(&row).unwrap();
        assert_eq!(record.status, AttendanceStatus::HalfDay);

        let mut row = raw(None, None);
        row.status = Some(AttendanceStatus::Leave);
        let record = Normalizer::default().normalize(&row).unwrap();
        assert_eq!(record.status, AttendanceStatus::Leave);
    }

    #[test]
    fn reversed_timestamps_keep_negative_hours() {
        let record = Normalizer::default()
            .normalize(&raw(Some("2025-11-03T17:00:00"), Some("2025-11-03T09:00:00")))
            .unwrap();
        assert_eq!(record.hours, -8.0);
        assert!(record.duration_anomaly);
        assert!(record.early_checkout);
    }

    #[test]
    fn bad_work_date_is_skipped_in_batches() {
        let mut broken = raw(None, None);
        broken.work_date = "03/11/2025".into();
        let rows = vec![broken, raw(None, None)];
        let records = Normalizer::default().normalize_all(&rows);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn offsets_are_read_in_report_zone() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 13:30Z is 08:30 in New York (EST in November).
        let record = Normalizer::new(tz)
            .normalize(&raw(Some("2025-11-03T13:30:00Z"), Some("2025-11-03T23:30:00Z")))
            .unwrap();
        assert!(record.early_checkin);
        assert!(record.late_checkout);
        assert_eq!(record.hours, 10.0);
    }
}
