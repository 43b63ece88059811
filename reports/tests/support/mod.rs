#![allow(dead_code)]

use chrono::NaiveDate;
use hrdash_reports::models::RawAttendanceRecord;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn attendance_row(
    user_id: &str,
    name: &str,
    role: &str,
    work_date: &str,
    check_in: Option<&str>,
    check_out: Option<&str>,
) -> RawAttendanceRecord {
    RawAttendanceRecord {
        user_id: user_id.to_string(),
        employee_code: format!("EMP-{}", user_id),
        employee_name: name.to_string(),
        department: "Operations".to_string(),
        role: role.to_string(),
        work_date: work_date.to_string(),
        check_in_at: check_in.map(|t| format!("{}T{}:00", work_date, t)),
        check_out_at: check_out.map(|t| format!("{}T{}:00", work_date, t)),
        status: None,
    }
}
