//! Week and month windowing.
//!
//! Weeks start on Monday. A Sunday belongs to the week that began six days
//! earlier, so a week straddling a month or year boundary shows up in both
//! months' enumerations.

use chrono::{Datelike, Duration, Months, NaiveDate};
use chrono_tz::Tz;

use crate::{
    error::ReportError,
    models::{WeekDay, WeekWindow},
    utils::time::today_local,
};

pub fn week_window_containing(date: NaiveDate) -> WeekWindow {
    let start_date = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    window_starting(start_date)
}

pub fn previous_week(window: &WeekWindow) -> WeekWindow {
    window_starting(window.start_date - Duration::days(7))
}

pub fn next_week(window: &WeekWindow) -> WeekWindow {
    window_starting(window.start_date + Duration::days(7))
}

pub fn current_week(tz: &Tz) -> WeekWindow {
    week_window_containing(today_local(tz))
}

/// Every Monday-start week with at least one day inside `year`/`month`,
/// oldest first, beginning with the week that contains the 1st.
pub fn weeks_overlapping_month(year: i32, month: u32) -> Result<Vec<WeekWindow>, ReportError> {
    let (first_day, last_day) = month_bounds(year, month)
        .ok_or_else(|| ReportError::InvalidPeriod(format!("{}-{:02}", year, month)))?;

    let mut windows = Vec::new();
    let mut window = week_window_containing(first_day);
    while window.start_date <= last_day {
        windows.push(window);
        window = next_week(&window);
    }
    Ok(windows)
}

pub fn days_in_week(window: &WeekWindow) -> [WeekDay; 7] {
    std::array::from_fn(|offset| {
        let date = window.start_date + Duration::days(offset as i64);
        WeekDay {
            date,
            weekday_name: date.format("%A").to_string(),
            display_date: date.format("%b %-d, %Y").to_string(),
        }
    })
}

/// First and last day of the month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = first.checked_add_months(Months::new(1))?;
    let last = next_month.pred_opt()?;
    Some((first, last))
}

/// Moves `(year, month)` by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn window_starting(start_date: NaiveDate) -> WeekWindow {
    WeekWindow {
        start_date,
        end_date: start_date + Duration::days(6),
        week_number: week_of_month(start_date),
    }
}

/// `ceil((day_of_month + weekday_of_first) / 7)` with Sunday as 0.
fn week_of_month(date: NaiveDate) -> u32 {
    let offset = date
        .with_day(1)
        .map(|first| first.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (date.day() + offset + 6) / 7
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sunday_belongs_to_previous_monday() {
        let window = week_window_containing(date(2025, 11, 2));
        assert_eq!(window.start_date, date(2025, 10, 27));
        assert_eq!(window.end_date, date(2025, 11, 2));
    }

    #[test]
    fn week_number_uses_sunday_based_offset_of_first() {
        // 2025-11-01 is a Saturday (offset 6).
        assert_eq!(week_window_containing(date(2025, 11, 5)).week_number, 2);
        assert_eq!(week_window_containing(date(2025, 11, 12)).week_number, 3);
        // 2025-10-01 is a Wednesday (offset 3): ceil((27 + 3) / 7) = 5.
        assert_eq!(week_window_containing(date(2025, 11, 1)).week_number, 5);
    }

    #[test]
    fn month_bounds_handles_february() {
        assert_eq!(
            month_bounds(2024, 2),
            Some((date(2024, 2, 1), date(2024, 2, 29)))
        );
        assert_eq!(
            month_bounds(2025, 2),
            Some((date(2025, 2, 1), date(2025, 2, 28)))
        );
        assert_eq!(month_bounds(2025, 13), None);
    }

    #[test]
    fn shift_month_wraps_years() {
        assert_eq!(shift_month(2025, 12, 1), (2026, 1));
        assert_eq!(shift_month(2025, 1, -1), (2024, 12));
        assert_eq!(shift_month(2025, 6, 0), (2025, 6));
        assert_eq!(shift_month(2025, 3, -15), (2023, 12));
    }

    #[test]
    fn days_in_week_expands_monday_to_sunday() {
        let days = days_in_week(&week_window_containing(date(2025, 11, 5)));
        assert_eq!(days[0].date, date(2025, 11, 3));
        assert_eq!(days[0].weekday_name, "Monday");
        assert_eq!(days[0].display_date, "Nov 3, 2025");
        assert_eq!(days[6].date, date(2025, 11, 9));
        assert_eq!(days[6].weekday_name, "Sunday");
        assert_eq!(days[6].date.weekday(), Weekday::Sun);
    }

    #[test]
    fn invalid_month_is_rejected() {
        let err = weeks_overlapping_month(2025, 0).unwrap_err();
        assert!(matches!(err, ReportError::InvalidPeriod(_)));
    }
}
