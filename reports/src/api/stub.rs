use async_trait::async_trait;
use chrono::NaiveDate;
use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};

use crate::{api::AttendanceSource, error::FetchError, models::RawAttendanceRecord};

/// In-memory attendance source.
///
/// Requests whose range covers a date registered with [`fail_on`] answer
/// with a server error, which lets callers exercise partial failures.
///
/// [`fail_on`]: AttendanceSourceStub::fail_on
#[derive(Clone, Default)]
pub struct AttendanceSourceStub {
    rows: Arc<Vec<RawAttendanceRecord>>,
    failing_dates: BTreeSet<NaiveDate>,
    calls: Arc<Mutex<Vec<(NaiveDate, NaiveDate)>>>,
}

impl AttendanceSourceStub {
    pub fn new(rows: impl IntoIterator<Item = RawAttendanceRecord>) -> Self {
        Self {
            rows: Arc::new(rows.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn fail_on(mut self, date: NaiveDate) -> Self {
        self.failing_dates.insert(date);
        self
    }

    /// Ranges requested so far, in call order.
    pub fn calls(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn rows_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawAttendanceRecord>, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((start, end));
        }
        if start > end {
            return Ok(Vec::new());
        }
        if self.failing_dates.range(start..=end).next().is_some() {
            return Err(FetchError::Status {
                status: 500,
                message: format!("stub failure for {} to {}", start, end),
            });
        }
        Ok(self
            .rows
            .iter()
            .filter(|row| {
                NaiveDate::parse_from_str(&row.work_date, "%Y-%m-%d")
                    .map(|date| start <= date && date <= end)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttendanceSource for AttendanceSourceStub {
    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawAttendanceRecord>, FetchError> {
        self.rows_between(start, end)
    }

    async fn fetch_date(&self, date: NaiveDate) -> Result<Vec<RawAttendanceRecord>, FetchError> {
        self.rows_between(date, date)
    }
}
