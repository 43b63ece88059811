pub mod report;

pub use report::{
    CsvExport, GroupKey, Notice, NoticeLevel, ReportController, ReportQuery, ReportSnapshot,
    ReportTab,
};
