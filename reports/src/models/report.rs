use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{error::FetchFailure, models::attendance::NormalizedDayRecord};

/// Monday-through-Sunday reporting week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WeekWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub week_number: u32,
}

impl WeekWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekDay {
    pub date: NaiveDate,
    pub weekday_name: String,
    pub display_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeWeeklyAggregate {
    pub employee_id: String,
    pub employee_code: String,
    pub employee_name: String,
    pub department: String,
    pub role: String,
    pub daily_attendance: Vec<NormalizedDayRecord>,
    pub total_hours: f64,
    pub present_days: u32,
    pub absent_days: u32,
    pub leave_days: u32,
    pub late_arrivals: u32,
    pub early_checkouts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyWeekAggregate {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    /// 1-based position of the week in the month's enumeration.
    pub week_number: u32,
    pub employees: Vec<EmployeeWeeklyAggregate>,
    pub total_hours: f64,
    pub present_days: u32,
    pub absent_days: u32,
    #[serde(skip)]
    pub failure: Option<FetchFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub leave: u32,
    pub half_day: u32,
    pub late_arrivals: u32,
    pub early_checkouts: u32,
    pub total_hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReport {
    pub window: WeekWindow,
    pub by_date: BTreeMap<NaiveDate, Vec<NormalizedDayRecord>>,
    pub employees: Vec<EmployeeWeeklyAggregate>,
    pub failure: Option<FetchFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<MonthlyWeekAggregate>,
    pub total_hours: f64,
    pub present_days: u32,
    pub absent_days: u32,
}

impl MonthlyReport {
    pub fn failures(&self) -> impl Iterator<Item = &FetchFailure> {
        self.weeks.iter().filter_map(|week| week.failure.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateReport {
    pub date: NaiveDate,
    pub records: Vec<NormalizedDayRecord>,
    pub summary: DailySummary,
    pub failure: Option<FetchFailure>,
}

/// Date range a report covers; each report tab has its own granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Week(WeekWindow),
    Month { year: i32, month: u32 },
    Date(NaiveDate),
}

impl ReportPeriod {
    pub fn kind(&self) -> &'static str {
        match self {
            ReportPeriod::Week(_) => "weekly",
            ReportPeriod::Month { .. } => "monthly",
            ReportPeriod::Date(_) => "date-based",
        }
    }
}
