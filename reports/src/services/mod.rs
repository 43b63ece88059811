pub mod aggregator;
pub mod calendar;
pub mod export;
pub mod normalizer;
pub mod report;

pub use aggregator::RecordFilter;
pub use normalizer::Normalizer;
pub use report::AttendanceReportService;
