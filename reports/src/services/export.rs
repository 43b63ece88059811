use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

use crate::{
    error::ReportError,
    models::{
        EmployeeWeeklyAggregate, MonthlyReport, MonthlyWeekAggregate, NormalizedDayRecord,
        ReportPeriod,
    },
    utils::{
        csv::write_quoted_csv,
        time::{format_clock_12h, format_iso_date},
    },
};

/// One exported line: ordered `(column, value)` pairs.
///
/// Rows built from different views may carry different columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularRow {
    cells: Vec<(String, String)>,
}

impl TabularRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column`, replacing an existing value in place.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(key, _)| *key == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(key, _)| key == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(key, _)| key.as_str())
    }
}

/// Aggregate to flatten, tagged with the view it came from.
#[derive(Debug, Clone, Copy)]
pub enum ExportSource<'a> {
    ByDate(&'a BTreeMap<NaiveDate, Vec<NormalizedDayRecord>>),
    ByWeek(&'a MonthlyReport),
    ByEmployee(&'a [EmployeeWeeklyAggregate]),
    Day(&'a [NormalizedDayRecord]),
}

/// Flattens an aggregate into one row per (employee, day).
pub fn to_rows(source: ExportSource<'_>) -> Vec<TabularRow> {
    match source {
        ExportSource::ByDate(grouped) => grouped
            .values()
            .flat_map(|records| records.iter().map(record_row))
            .collect(),
        ExportSource::ByWeek(report) => report.weeks.iter().flat_map(week_rows).collect(),
        ExportSource::ByEmployee(employees) => employees
            .iter()
            .flat_map(|employee| employee.daily_attendance.iter().map(record_row))
            .collect(),
        ExportSource::Day(records) => records.iter().map(record_row).collect(),
    }
}

fn week_rows(week: &MonthlyWeekAggregate) -> Vec<TabularRow> {
    let label = format!(
        "Week {} ({} - {})",
        week.week_number,
        format_iso_date(week.week_start),
        format_iso_date(week.week_end)
    );
    week.employees
        .iter()
        .flat_map(|employee| employee.daily_attendance.iter())
        .map(|record| {
            let mut row = TabularRow::new();
            row.set("Week", label.clone());
            for (column, value) in record_row(record).cells {
                row.set(column, value);
            }
            row
        })
        .collect()
}

fn record_row(record: &NormalizedDayRecord) -> TabularRow {
    let mut row = TabularRow::new();
    row.set("Date", format_iso_date(record.work_date));
    row.set("Day", record.work_date.format("%A").to_string());
    row.set("Employee Code", record.employee_code.as_str());
    row.set("Employee Name", record.employee_name.as_str());
    row.set("Department", record.department.as_str());
    row.set("Status", record.status.label());
    row.set("Check In", clock_or_dash(record.check_in_at.as_ref()));
    row.set("Check Out", clock_or_dash(record.check_out_at.as_ref()));
    row.set("Late Arrival", yes_no(record.late_arrival));
    row.set("Early Checkout", yes_no(record.early_checkout));
    row.set("Late Checkout", yes_no(record.late_checkout));
    row.set("Early Check-in", yes_no(record.early_checkin));
    row.set("Total Hours", format_hours(record.hours));
    row
}

fn clock_or_dash(value: Option<&chrono::NaiveDateTime>) -> String {
    value.map(format_clock_12h).unwrap_or_else(|| "-".to_string())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// `7.8h`, `9h`, or `-` for zero.
pub fn format_hours(hours: f64) -> String {
    if hours == 0.0 {
        "-".to_string()
    } else {
        format!("{}h", hours)
    }
}

/// Serializes rows under the union of all their columns.
///
/// The header is collected in a first pass (first-seen order) because rows
/// may differ in shape; cells missing from a row are written empty.
pub fn to_csv(rows: &[TabularRow]) -> Result<String, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::NoData);
    }

    let mut seen = HashSet::new();
    let header: Vec<String> = rows
        .iter()
        .flat_map(TabularRow::columns)
        .filter(|column| seen.insert(*column))
        .map(str::to_owned)
        .collect();

    let records = rows.iter().map(|row| {
        header
            .iter()
            .map(|column| row.get(column).unwrap_or(""))
            .collect::<Vec<_>>()
    });

    Ok(write_quoted_csv(&header, records)?)
}

pub fn export_filename(period: &ReportPeriod) -> String {
    let kind = period.kind();
    match period {
        ReportPeriod::Week(window) => format!(
            "{}-attendance-report-{}-to-{}.csv",
            kind,
            format_iso_date(window.start_date),
            format_iso_date(window.end_date)
        ),
        ReportPeriod::Date(date) => format!(
            "{}-attendance-report-{}-to-{}.csv",
            kind,
            format_iso_date(*date),
            format_iso_date(*date)
        ),
        ReportPeriod::Month { year, month } => {
            format!("{}-attendance-report-{}-{:02}.csv", kind, year, month)
        }
    }
}
