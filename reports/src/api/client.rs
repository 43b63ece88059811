use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    api::{session, AttendanceSource, RequestContext},
    error::FetchError,
    models::RawAttendanceRecord,
    utils::time::format_iso_date,
};

const COMPANY_HEADER: &str = "X-Company-Id";

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    context: Arc<RequestContext>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsPayload {
    List(Vec<RawAttendanceRecord>),
    Wrapped { data: Vec<RawAttendanceRecord> },
}

impl RecordsPayload {
    fn into_records(self) -> Vec<RawAttendanceRecord> {
        match self {
            RecordsPayload::List(records) | RecordsPayload::Wrapped { data: records } => records,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    pub fn new(context: Arc<RequestContext>) -> Self {
        Self {
            client: Client::new(),
            context,
        }
    }

    /// Client bound to the currently active session.
    pub fn from_session() -> Result<Self, FetchError> {
        session::current()
            .map(Self::new)
            .ok_or(FetchError::NoSession)
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub async fn get_attendance_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawAttendanceRecord>, FetchError> {
        let url = format!("{}/attendance/report", self.context.api_base_url());
        self.get_records(
            &url,
            &[
                ("startDate", format_iso_date(start)),
                ("endDate", format_iso_date(end)),
            ],
        )
        .await
    }

    pub async fn get_team_attendance(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RawAttendanceRecord>, FetchError> {
        let url = format!("{}/attendance/team", self.context.api_base_url());
        self.get_records(&url, &[("date", format_iso_date(date))])
            .await
    }

    async fn get_records(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<RawAttendanceRecord>, FetchError> {
        tracing::debug!(url, ?query, "Fetching attendance rows");

        let mut request = self.client.get(url).query(query);
        if let Some(token) = self.context.access_token() {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(company_id) = self.context.company_id() {
            request = request.header(COMPANY_HEADER, company_id);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            let payload: RecordsPayload = response
                .json()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))?;
            let records = payload.into_records();
            tracing::debug!(url, count = records.len(), "Fetched attendance rows");
            Ok(records)
        } else {
            let message = error_message(status, response.text().await.unwrap_or_default());
            tracing::warn!(url, status = status.as_u16(), %message, "Attendance request failed");
            Err(FetchError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn error_message(status: StatusCode, body: String) -> String {
    let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
    parsed
        .error
        .or(parsed.message)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        })
}

#[async_trait]
impl AttendanceSource for ApiClient {
    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawAttendanceRecord>, FetchError> {
        self.get_attendance_range(start, end).await
    }

    async fn fetch_date(&self, date: NaiveDate) -> Result<Vec<RawAttendanceRecord>, FetchError> {
        self.get_team_attendance(date).await
    }
}
