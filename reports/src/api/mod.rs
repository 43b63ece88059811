pub mod client;
pub mod session;
pub mod stub;

pub use client::*;
pub use session::RequestContext;
pub use stub::AttendanceSourceStub;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{error::FetchError, models::RawAttendanceRecord};

/// Backend collaborator supplying raw attendance rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttendanceSource: Send + Sync {
    /// Rows for every visible employee with `start <= workDate <= end`.
    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawAttendanceRecord>, FetchError>;

    /// Rows of the whole team for a single day.
    async fn fetch_date(&self, date: NaiveDate) -> Result<Vec<RawAttendanceRecord>, FetchError>;
}
