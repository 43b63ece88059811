use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use crate::{
    error::{FetchFailure, ReportError},
    models::{DateReport, MonthlyReport, ReportPeriod, WeeklyReport},
    services::{
        calendar::{next_week, previous_week, shift_month, week_window_containing},
        export::{export_filename, to_csv, to_rows, ExportSource, TabularRow},
        AttendanceReportService, RecordFilter,
    },
    utils::time::today_local,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportTab {
    Weekly,
    Monthly,
    DateBased,
}

impl ReportTab {
    /// The tab's natural period around `today`.
    pub fn default_period(&self, today: NaiveDate) -> ReportPeriod {
        match self {
            ReportTab::Weekly => ReportPeriod::Week(week_window_containing(today)),
            ReportTab::Monthly => ReportPeriod::Month {
                year: today.year(),
                month: today.month(),
            },
            ReportTab::DateBased => ReportPeriod::Date(today),
        }
    }
}

/// Parameters of the report currently requested.
///
/// `token` changes with every parameter change so that a response can be
/// matched against the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub tab: ReportTab,
    pub period: ReportPeriod,
    pub filter: RecordFilter,
    pub token: u32,
}

impl ReportQuery {
    pub fn new(tab: ReportTab, today: NaiveDate) -> Self {
        Self {
            tab,
            period: tab.default_period(today),
            filter: RecordFilter::default(),
            token: 0,
        }
    }

    pub fn with_tab(self, tab: ReportTab, today: NaiveDate) -> Self {
        Self {
            tab,
            period: tab.default_period(today),
            filter: self.filter,
            token: self.token.wrapping_add(1),
        }
    }

    pub fn with_period(self, period: ReportPeriod) -> Self {
        Self {
            period,
            token: self.token.wrapping_add(1),
            ..self
        }
    }

    pub fn with_filter(self, filter: RecordFilter) -> Self {
        Self {
            filter,
            token: self.token.wrapping_add(1),
            ..self
        }
    }
}

/// Identifier of an expandable group in the report views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Date(NaiveDate),
    Week(NaiveDate),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportSnapshot {
    Weekly(WeeklyReport),
    Monthly(MonthlyReport),
    DateBased(DateReport),
}

impl ReportSnapshot {
    pub fn period(&self) -> ReportPeriod {
        match self {
            ReportSnapshot::Weekly(report) => ReportPeriod::Week(report.window),
            ReportSnapshot::Monthly(report) => ReportPeriod::Month {
                year: report.year,
                month: report.month,
            },
            ReportSnapshot::DateBased(report) => ReportPeriod::Date(report.date),
        }
    }

    pub fn failures(&self) -> Vec<&FetchFailure> {
        match self {
            ReportSnapshot::Weekly(report) => report.failure.iter().collect(),
            ReportSnapshot::Monthly(report) => report.failures().collect(),
            ReportSnapshot::DateBased(report) => report.failure.iter().collect(),
        }
    }

    pub fn export_rows(&self) -> Vec<TabularRow> {
        match self {
            ReportSnapshot::Weekly(report) => to_rows(ExportSource::ByDate(&report.by_date)),
            ReportSnapshot::Monthly(report) => to_rows(ExportSource::ByWeek(report)),
            ReportSnapshot::DateBased(report) => to_rows(ExportSource::Day(&report.records)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-facing message (rendered as a toast by the UI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub csv: String,
}

impl CsvExport {
    /// Writes the file into `dir`, creating it when missing.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, self.csv.as_bytes())?;
        tracing::info!(path = %path.display(), bytes = self.csv.len(), "Wrote attendance export");
        Ok(path)
    }
}

/// A load that has been started but not applied yet.
pub struct PendingLoad {
    query: ReportQuery,
    service: AttendanceReportService,
}

impl PendingLoad {
    pub fn token(&self) -> u32 {
        self.query.token
    }

    pub async fn run(self) -> LoadedReport {
        let filter = &self.query.filter;
        let result = match self.query.period {
            ReportPeriod::Week(window) => Ok(ReportSnapshot::Weekly(
                self.service.weekly_report(window, filter).await,
            )),
            ReportPeriod::Month { year, month } => self
                .service
                .monthly_report(year, month, filter)
                .await
                .map(ReportSnapshot::Monthly),
            ReportPeriod::Date(date) => Ok(ReportSnapshot::DateBased(
                self.service.date_report(date, filter).await,
            )),
        };
        LoadedReport {
            token: self.query.token,
            result,
        }
    }
}

pub struct LoadedReport {
    token: u32,
    result: Result<ReportSnapshot, ReportError>,
}

/// State behind the attendance report screen.
pub struct ReportController {
    service: AttendanceReportService,
    time_zone: Tz,
    query: ReportQuery,
    snapshot: Option<ReportSnapshot>,
    /// Token of the load in flight, if any.
    in_flight: Option<u32>,
    expanded: HashSet<GroupKey>,
    notice: Option<Notice>,
}

impl ReportController {
    pub fn new(service: AttendanceReportService, time_zone: Tz) -> Self {
        let today = today_local(&time_zone);
        Self {
            service,
            time_zone,
            query: ReportQuery::new(ReportTab::Weekly, today),
            snapshot: None,
            in_flight: None,
            expanded: HashSet::new(),
            notice: None,
        }
    }

    pub fn query(&self) -> &ReportQuery {
        &self.query
    }

    pub fn tab(&self) -> ReportTab {
        self.query.tab
    }

    pub fn snapshot(&self) -> Option<&ReportSnapshot> {
        self.snapshot.as_ref()
    }

    /// True while a load for the current parameters is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight == Some(self.query.token)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn select_tab(&mut self, tab: ReportTab) {
        let today = today_local(&self.time_zone);
        self.select_tab_on(tab, today);
    }

    /// Switches tab and resets the period to the tab's natural range around
    /// `today`.
    pub fn select_tab_on(&mut self, tab: ReportTab, today: NaiveDate) {
        self.query = self.query.clone().with_tab(tab, today);
        self.snapshot = None;
        self.notice = None;
        tracing::debug!(?tab, period = ?self.query.period, "Report tab selected");
    }

    pub fn previous_period(&mut self) {
        let period = match self.query.period {
            ReportPeriod::Week(window) => ReportPeriod::Week(previous_week(&window)),
            ReportPeriod::Month { year, month } => {
                let (year, month) = shift_month(year, month, -1);
                ReportPeriod::Month { year, month }
            }
            ReportPeriod::Date(date) => ReportPeriod::Date(date - Duration::days(1)),
        };
        self.set_period(period);
    }

    pub fn next_period(&mut self) {
        let period = match self.query.period {
            ReportPeriod::Week(window) => ReportPeriod::Week(next_week(&window)),
            ReportPeriod::Month { year, month } => {
                let (year, month) = shift_month(year, month, 1);
                ReportPeriod::Month { year, month }
            }
            ReportPeriod::Date(date) => ReportPeriod::Date(date + Duration::days(1)),
        };
        self.set_period(period);
    }

    /// Picks a day for the date-based report.
    pub fn select_date(&mut self, date: NaiveDate) {
        if self.query.tab != ReportTab::DateBased {
            self.query = self.query.clone().with_tab(ReportTab::DateBased, date);
            self.snapshot = None;
            return;
        }
        self.set_period(ReportPeriod::Date(date));
    }

    pub fn set_role(&mut self, role: Option<String>) {
        let filter = RecordFilter {
            role,
            ..self.query.filter.clone()
        };
        self.query = self.query.clone().with_filter(filter);
    }

    pub fn set_search(&mut self, search: Option<String>) {
        let filter = RecordFilter {
            search,
            ..self.query.filter.clone()
        };
        self.query = self.query.clone().with_filter(filter);
    }

    pub fn is_expanded(&self, key: &GroupKey) -> bool {
        self.expanded.contains(key)
    }

    /// Flips a group open or closed and returns its new state.
    pub fn toggle_expanded(&mut self, key: GroupKey) -> bool {
        if self.expanded.remove(&key) {
            false
        } else {
            self.expanded.insert(key);
            true
        }
    }

    pub fn begin_load(&mut self) -> PendingLoad {
        self.in_flight = Some(self.query.token);
        self.notice = None;
        PendingLoad {
            query: self.query.clone(),
            service: self.service.clone(),
        }
    }

    /// Applies a finished load unless a newer request superseded it.
    pub fn finish_load(&mut self, loaded: LoadedReport) -> bool {
        if loaded.token != self.query.token {
            tracing::debug!(
                response_token = loaded.token,
                current_token = self.query.token,
                "Discarding stale report response"
            );
            return false;
        }

        self.in_flight = None;
        match loaded.result {
            Ok(snapshot) => {
                let failures = snapshot.failures();
                if !failures.is_empty() {
                    let units: Vec<&str> = failures.iter().map(|f| f.unit.as_str()).collect();
                    self.notice = Some(Notice::error(format!(
                        "Failed to load attendance for {}",
                        units.join(", ")
                    )));
                }
                self.snapshot = Some(snapshot);
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to build attendance report");
                self.notice = Some(Notice::error(err.user_message()));
                self.snapshot = None;
            }
        }
        true
    }

    pub async fn reload(&mut self) -> bool {
        let pending = self.begin_load();
        let loaded = pending.run().await;
        self.finish_load(loaded)
    }

    /// Serializes the shown report for download.
    pub fn export(&mut self) -> Result<CsvExport, ReportError> {
        match self.build_export() {
            Ok(export) => {
                tracing::info!(filename = %export.filename, "Exported attendance report");
                self.notice = Some(Notice::success(format!("Downloaded {}", export.filename)));
                Ok(export)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Attendance export aborted");
                self.notice = Some(Notice::error(err.user_message()));
                Err(err)
            }
        }
    }

    fn build_export(&self) -> Result<CsvExport, ReportError> {
        let snapshot = self.snapshot.as_ref().ok_or(ReportError::NoData)?;
        let csv = to_csv(&snapshot.export_rows())?;
        Ok(CsvExport {
            filename: export_filename(&snapshot.period()),
            csv,
        })
    }

    fn set_period(&mut self, period: ReportPeriod) {
        self.query = self.query.clone().with_period(period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::AttendanceSourceStub, models::RawAttendanceRecord, services::Normalizer};
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(user: &str, role: &str, day: &str) -> RawAttendanceRecord {
        RawAttendanceRecord {
            user_id: user.into(),
            employee_code: format!("E-{}", user),
            employee_name: format!("Employee {}", user),
            department: "Ops".into(),
            role: role.into(),
            work_date: day.into(),
            check_in_at: Some(format!("{}T09:00:00", day)),
            check_out_at: Some(format!("{}T17:00:00", day)),
            status: None,
        }
    }

    fn controller(stub: AttendanceSourceStub) -> ReportController {
        let service = AttendanceReportService::new(Arc::new(stub), Normalizer::default());
        ReportController::new(service, chrono_tz::UTC)
    }

    #[test]
    fn tab_selection_resets_period_and_bumps_token() {
        let mut ctl = controller(AttendanceSourceStub::default());
        let today = date(2025, 11, 12);
        let before = ctl.query().token;

        ctl.select_tab_on(ReportTab::Monthly, today);
        assert_eq!(
            ctl.query().period,
            ReportPeriod::Month {
                year: 2025,
                month: 11
            }
        );
        assert_ne!(ctl.query().token, before);

        ctl.select_tab_on(ReportTab::Weekly, today);
        match ctl.query().period {
            ReportPeriod::Week(window) => assert_eq!(window.start_date, date(2025, 11, 10)),
            other => panic!("unexpected period {:?}", other),
        }

        ctl.select_tab_on(ReportTab::DateBased, today);
        assert_eq!(ctl.query().period, ReportPeriod::Date(today));
    }

    #[test]
    fn navigation_moves_by_tab_granularity() {
        let mut ctl = controller(AttendanceSourceStub::default());
        ctl.select_tab_on(ReportTab::Monthly, date(2025, 1, 15));
        ctl.previous_period();
        assert_eq!(
            ctl.query().period,
            ReportPeriod::Month {
                year: 2024,
                month: 12
            }
        );

        ctl.select_tab_on(ReportTab::Weekly, date(2025, 12, 31));
        ctl.next_period();
        match ctl.query().period {
            ReportPeriod::Week(window) => assert_eq!(window.start_date, date(2026, 1, 5)),
            other => panic!("unexpected period {:?}", other),
        }
    }

    #[test]
    fn groups_default_to_collapsed() {
        let mut ctl = controller(AttendanceSourceStub::default());
        let key = GroupKey::Date(date(2025, 11, 3));
        assert!(!ctl.is_expanded(&key));
        assert!(ctl.toggle_expanded(key));
        assert!(ctl.is_expanded(&key));
        assert!(!ctl.is_expanded(&GroupKey::Week(date(2025, 11, 3))));
        assert!(!ctl.toggle_expanded(key));
        assert!(!ctl.is_expanded(&key));
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let stub = AttendanceSourceStub::new(vec![row("u1", "employee", "2025-11-03")]);
        let mut ctl = controller(stub);
        ctl.select_tab_on(ReportTab::Weekly, date(2025, 11, 3));

        let stale = ctl.begin_load();
        ctl.set_role(Some("manager".into()));
        let fresh = ctl.begin_load();

        let stale_loaded = stale.run().await;
        let fresh_loaded = fresh.run().await;

        assert!(ctl.finish_load(fresh_loaded));
        assert!(!ctl.finish_load(stale_loaded));
        match ctl.snapshot() {
            Some(ReportSnapshot::Weekly(report)) => assert!(report.employees.is_empty()),
            other => panic!("unexpected snapshot {:?}", other),
        }
        assert!(!ctl.is_loading());
    }

    #[tokio::test]
    async fn changing_parameters_mid_load_clears_loading() {
        let mut ctl = controller(AttendanceSourceStub::default());
        ctl.select_tab_on(ReportTab::Weekly, date(2025, 11, 3));

        let pending = ctl.begin_load();
        assert!(ctl.is_loading());
        ctl.select_tab_on(ReportTab::Monthly, date(2025, 11, 3));
        assert!(!ctl.is_loading());

        assert!(!ctl.finish_load(pending.run().await));
        assert!(!ctl.is_loading());
        assert!(ctl.snapshot().is_none());
    }

    #[test]
    fn csv_export_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let export = CsvExport {
            filename: "weekly-attendance-report-2025-11-03-to-2025-11-09.csv".into(),
            csv: "\"Date\"\n\"2025-11-03\"".into(),
        };
        let path = export.write_to(&dir.path().join("nested")).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), export.csv);
    }

    #[test]
    fn csv_export_reports_io_failures() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let export = CsvExport {
            filename: "out.csv".into(),
            csv: String::new(),
        };
        let err = export.write_to(&blocker).unwrap_err();
        assert!(matches!(err, ReportError::Io(_)));
        assert_eq!(err.user_message(), "Failed to generate the CSV file");
    }

    #[tokio::test]
    async fn export_without_data_sets_error_notice() {
        let mut ctl = controller(AttendanceSourceStub::default());
        ctl.select_tab_on(ReportTab::DateBased, date(2025, 11, 3));
        assert!(ctl.reload().await);

        let err = ctl.export().unwrap_err();
        assert!(matches!(err, ReportError::NoData));
        let notice = ctl.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "No attendance data to export");
    }

    #[tokio::test]
    async fn weekly_export_uses_window_filename() {
        let stub = AttendanceSourceStub::new(vec![
            row("u1", "employee", "2025-11-03"),
            row("u2", "employee", "2025-11-04"),
        ]);
        let mut ctl = controller(stub);
        ctl.select_tab_on(ReportTab::Weekly, date(2025, 11, 5));
        ctl.reload().await;

        let export = ctl.export().unwrap();
        assert_eq!(
            export.filename,
            "weekly-attendance-report-2025-11-03-to-2025-11-09.csv"
        );
        assert_eq!(export.csv.lines().count(), 3);
        assert_eq!(ctl.notice().unwrap().level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn failed_weeks_surface_as_one_notice() {
        let stub = AttendanceSourceStub::new(vec![row("u1", "employee", "2025-11-03")])
            .fail_on(date(2025, 11, 12));
        let mut ctl = controller(stub);
        ctl.select_tab_on(ReportTab::Monthly, date(2025, 11, 1));
        ctl.reload().await;

        let notice = ctl.take_notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("week 2025-11-10 to 2025-11-16"));
        match ctl.snapshot() {
            Some(ReportSnapshot::Monthly(report)) => {
                assert_eq!(report.weeks.len(), 5);
                assert_eq!(report.present_days, 1);
            }
            other => panic!("unexpected snapshot {:?}", other),
        }
    }
}
