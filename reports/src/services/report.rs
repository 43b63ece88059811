use chrono::NaiveDate;
use std::sync::Arc;

use crate::{
    api::AttendanceSource,
    error::{FetchError, FetchFailure, ReportError},
    models::{
        DateReport, MonthlyReport, NormalizedDayRecord, RawAttendanceRecord, WeekWindow,
        WeeklyReport,
    },
    services::{
        aggregator::{
            aggregate_by_date, aggregate_by_employee_week, assemble_month, month_week,
            dedupe_latest, summarize_day, RecordFilter,
        },
        calendar::weeks_overlapping_month,
        normalizer::Normalizer,
    },
};

/// Fetches raw rows and turns them into report aggregates.
///
/// A failed fetch never aborts a report: the affected unit (one week or one
/// date) comes back empty with its [`FetchFailure`] attached.
#[derive(Clone)]
pub struct AttendanceReportService {
    source: Arc<dyn AttendanceSource>,
    normalizer: Normalizer,
}

impl AttendanceReportService {
    pub fn new(source: Arc<dyn AttendanceSource>, normalizer: Normalizer) -> Self {
        Self { source, normalizer }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub async fn weekly_report(&self, window: WeekWindow, filter: &RecordFilter) -> WeeklyReport {
        let (records, failure) = match self.load_range(&window, filter).await {
            Ok(records) => (records, None),
            Err(err) => {
                tracing::error!(
                    week_start = %window.start_date,
                    error = %err,
                    "Failed to load weekly attendance"
                );
                (Vec::new(), Some(FetchFailure::new(week_unit(&window), &err)))
            }
        };

        WeeklyReport {
            window,
            by_date: aggregate_by_date(&records, &window),
            employees: aggregate_by_employee_week(&records),
            failure,
        }
    }

    /// One entry per week overlapping the month, fetched one after another.
    pub async fn monthly_report(
        &self,
        year: i32,
        month: u32,
        filter: &RecordFilter,
    ) -> Result<MonthlyReport, ReportError> {
        let windows = weeks_overlapping_month(year, month)?;
        let mut weeks = Vec::with_capacity(windows.len());

        for (index, window) in windows.iter().enumerate() {
            let ordinal = index as u32 + 1;
            let week = match self.load_range(window, filter).await {
                Ok(records) => month_week(ordinal, window, aggregate_by_employee_week(&records), None),
                Err(err) => {
                    tracing::error!(
                        year,
                        month,
                        week = ordinal,
                        week_start = %window.start_date,
                        error = %err,
                        "Failed to load week of monthly report; continuing with empty week"
                    );
                    let failure = FetchFailure::new(week_unit(window), &err);
                    month_week(ordinal, window, Vec::new(), Some(failure))
                }
            };
            weeks.push(week);
        }

        let report = assemble_month(year, month, weeks);
        tracing::info!(
            year,
            month,
            weeks = report.weeks.len(),
            failed_weeks = report.failures().count(),
            total_hours = report.total_hours,
            "Built monthly attendance report"
        );
        Ok(report)
    }

    pub async fn date_report(&self, date: NaiveDate, filter: &RecordFilter) -> DateReport {
        let loaded = self
            .source
            .fetch_date(date)
            .await
            .map(|rows| {
                self.prepare(rows, filter)
                    .into_iter()
                    .filter(|record| record.work_date == date)
                    .collect::<Vec<_>>()
            });

        let (records, failure) = match loaded {
            Ok(records) => (records, None),
            Err(err) => {
                tracing::error!(%date, error = %err, "Failed to load team attendance for date");
                (Vec::new(), Some(FetchFailure::new(format!("date {}", date), &err)))
            }
        };

        DateReport {
            date,
            summary: summarize_day(date, &records),
            records,
            failure,
        }
    }

    async fn load_range(
        &self,
        window: &WeekWindow,
        filter: &RecordFilter,
    ) -> Result<Vec<NormalizedDayRecord>, FetchError> {
        let rows = self
            .source
            .fetch_range(window.start_date, window.end_date)
            .await?;
        Ok(self.prepare(rows, filter))
    }

    fn prepare(
        &self,
        rows: Vec<RawAttendanceRecord>,
        filter: &RecordFilter,
    ) -> Vec<NormalizedDayRecord> {
        let fetched = rows.len();
        let kept = filter.apply(rows);
        tracing::debug!(fetched, kept = kept.len(), "Filtered attendance rows");
        dedupe_latest(self.normalizer.normalize_all(&kept))
    }
}

fn week_unit(window: &WeekWindow) -> String {
    format!("week {} to {}", window.start_date, window.end_date)
}
