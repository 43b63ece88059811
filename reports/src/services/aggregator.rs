use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::{
    error::FetchFailure,
    models::{
        AttendanceStatus, DailySummary, EmployeeWeeklyAggregate, MonthlyReport,
        MonthlyWeekAggregate, NormalizedDayRecord, RawAttendanceRecord, WeekWindow,
    },
    services::calendar::days_in_week,
};

/// Row filter applied to raw records before anything is aggregated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// `None` keeps every role.
    pub role: Option<String>,
    /// Case-insensitive match on employee name or code.
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            search: None,
        }
    }

    pub fn matches(&self, record: &RawAttendanceRecord) -> bool {
        let role_ok = match self.role.as_deref().map(str::trim) {
            None | Some("") | Some("all") => true,
            Some(role) => record.role.eq_ignore_ascii_case(role),
        };
        if !role_ok {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                record.employee_name.to_lowercase().contains(&needle)
                    || record.employee_code.to_lowercase().contains(&needle)
            }
        }
    }

    pub fn apply(&self, records: Vec<RawAttendanceRecord>) -> Vec<RawAttendanceRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Collapses rows sharing an employee and day into one, keeping the later
/// row at the position of the first.
pub fn dedupe_latest(records: Vec<NormalizedDayRecord>) -> Vec<NormalizedDayRecord> {
    let mut seen: HashMap<(String, NaiveDate), usize> = HashMap::new();
    let mut kept: Vec<NormalizedDayRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = (record.user_id.clone(), record.work_date);
        match seen.get(&key) {
            Some(&index) => {
                tracing::warn!(
                    user_id = %record.user_id,
                    work_date = %record.work_date,
                    "Duplicate attendance row for employee and day; keeping the later one"
                );
                kept[index] = record;
            }
            None => {
                seen.insert(key, kept.len());
                kept.push(record);
            }
        }
    }
    kept
}

/// Groups records by day of `window`; every day is a key, empty or not.
pub fn aggregate_by_date(
    records: &[NormalizedDayRecord],
    window: &WeekWindow,
) -> BTreeMap<NaiveDate, Vec<NormalizedDayRecord>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<NormalizedDayRecord>> = days_in_week(window)
        .into_iter()
        .map(|day| (day.date, Vec::new()))
        .collect();

    for record in records {
        match grouped.get_mut(&record.work_date) {
            Some(bucket) => bucket.push(record.clone()),
            None => tracing::debug!(
                user_id = %record.user_id,
                work_date = %record.work_date,
                "Dropping record outside of week window"
            ),
        }
    }
    grouped
}

/// One aggregate per distinct employee, in order of first appearance.
///
/// Days without a record are omitted rather than zero-filled. A second row
/// for the same employee and day replaces the first.
pub fn aggregate_by_employee_week(records: &[NormalizedDayRecord]) -> Vec<EmployeeWeeklyAggregate> {
    let mut order: Vec<String> = Vec::new();
    let mut days: HashMap<String, BTreeMap<NaiveDate, NormalizedDayRecord>> = HashMap::new();

    for record in records {
        let entry = days.entry(record.user_id.clone()).or_insert_with(|| {
            order.push(record.user_id.clone());
            BTreeMap::new()
        });
        if entry.insert(record.work_date, record.clone()).is_some() {
            tracing::warn!(
                user_id = %record.user_id,
                work_date = %record.work_date,
                "Duplicate attendance row for employee and day; keeping the later one"
            );
        }
    }

    order
        .into_iter()
        .filter_map(|user_id| days.remove(&user_id))
        .map(|by_day| employee_aggregate(by_day.into_values().collect()))
        .collect()
}

fn employee_aggregate(daily_attendance: Vec<NormalizedDayRecord>) -> EmployeeWeeklyAggregate {
    let identity = daily_attendance.last().cloned();
    let mut aggregate = EmployeeWeeklyAggregate {
        employee_id: String::new(),
        employee_code: String::new(),
        employee_name: String::new(),
        department: String::new(),
        role: String::new(),
        daily_attendance: Vec::new(),
        total_hours: 0.0,
        present_days: 0,
        absent_days: 0,
        leave_days: 0,
        late_arrivals: 0,
        early_checkouts: 0,
    };
    if let Some(identity) = identity {
        aggregate.employee_id = identity.user_id;
        aggregate.employee_code = identity.employee_code;
        aggregate.employee_name = identity.employee_name;
        aggregate.department = identity.department;
        aggregate.role = identity.role;
    }

    for day in &daily_attendance {
        aggregate.total_hours += day.hours;
        match day.status {
            AttendanceStatus::Present => aggregate.present_days += 1,
            AttendanceStatus::Absent => aggregate.absent_days += 1,
            AttendanceStatus::Leave => aggregate.leave_days += 1,
            AttendanceStatus::HalfDay | AttendanceStatus::Weekend | AttendanceStatus::Holiday => {}
        }
        aggregate.late_arrivals += u32::from(day.late_arrival);
        aggregate.early_checkouts += u32::from(day.early_checkout);
    }
    aggregate.total_hours = round_hours(aggregate.total_hours);
    aggregate.daily_attendance = daily_attendance;
    aggregate
}

/// Wraps one week's employee aggregates with week metadata and totals.
pub fn month_week(
    ordinal: u32,
    window: &WeekWindow,
    employees: Vec<EmployeeWeeklyAggregate>,
    failure: Option<FetchFailure>,
) -> MonthlyWeekAggregate {
    let total_hours = round_hours(employees.iter().map(|e| e.total_hours).sum());
    let present_days = employees.iter().map(|e| e.present_days).sum();
    let absent_days = employees.iter().map(|e| e.absent_days).sum();
    MonthlyWeekAggregate {
        week_start: window.start_date,
        week_end: window.end_date,
        week_number: ordinal,
        employees,
        total_hours,
        present_days,
        absent_days,
        failure,
    }
}

/// Monthly totals are sums over the contained weeks.
pub fn assemble_month(year: i32, month: u32, weeks: Vec<MonthlyWeekAggregate>) -> MonthlyReport {
    let total_hours = round_hours(weeks.iter().map(|w| w.total_hours).sum());
    let present_days = weeks.iter().map(|w| w.present_days).sum();
    let absent_days = weeks.iter().map(|w| w.absent_days).sum();
    MonthlyReport {
        year,
        month,
        weeks,
        total_hours,
        present_days,
        absent_days,
    }
}

pub fn summarize_day(date: NaiveDate, records: &[NormalizedDayRecord]) -> DailySummary {
    let mut summary = DailySummary {
        date,
        total: 0,
        present: 0,
        absent: 0,
        leave: 0,
        half_day: 0,
        late_arrivals: 0,
        early_checkouts: 0,
        total_hours: 0.0,
    };
    for record in records.iter().filter(|r| r.work_date == date) {
        summary.total += 1;
        match record.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Leave => summary.leave += 1,
            AttendanceStatus::HalfDay => summary.half_day += 1,
            AttendanceStatus::Weekend | AttendanceStatus::Holiday => {}
        }
        summary.late_arrivals += u32::from(record.late_arrival);
        summary.early_checkouts += u32::from(record.early_checkout);
        summary.total_hours += record.hours;
    }
    summary.total_hours = round_hours(summary.total_hours);
    summary
}

/// Sums of 1-decimal values drift in binary; keep totals on the same grid.
fn round_hours(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}
