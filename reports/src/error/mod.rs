use thiserror::Error;

/// Failure of a single collaborator call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("no active session")]
    NoSession,
}

/// A fetch failure recorded against one aggregation unit (a week, a date).
///
/// The aggregator keeps these next to the degraded data instead of
/// propagating them; the controller turns them into notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub unit: String,
    pub message: String,
}

impl FetchFailure {
    pub fn new(unit: impl Into<String>, error: &FetchError) -> Self {
        Self {
            unit: unit.into(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no attendance data to export")]
    NoData,
    #[error("invalid report period: {0}")]
    InvalidPeriod(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Text suitable for a user-facing notice.
    pub fn user_message(&self) -> String {
        match self {
            ReportError::NoData => "No attendance data to export".to_string(),
            ReportError::InvalidPeriod(detail) => format!("Invalid report period: {}", detail),
            ReportError::Fetch(err) => format!("Failed to load attendance: {}", err),
            ReportError::Csv(_) | ReportError::Io(_) => "Failed to generate the CSV file".to_string(),
        }
    }
}
