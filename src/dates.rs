//! Date range and relative-date calculations.
//!
//! Pure functions over an injected "now" so results are deterministic in
//! tests. All outputs carry both a display form (`YYYY-MM-DD`) and a
//! machine-parseable ISO form. Weeks start on Monday.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Display format for dates.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d";
/// ISO format for API use.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A named period resolvable to a start/end date pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    NextMonth,
    ThisYear,
    LastYear,
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "today" => Ok(Period::Today),
            "yesterday" => Ok(Period::Yesterday),
            "this_week" => Ok(Period::ThisWeek),
            "last_week" => Ok(Period::LastWeek),
            "this_month" => Ok(Period::ThisMonth),
            "last_month" => Ok(Period::LastMonth),
            "next_month" => Ok(Period::NextMonth),
            "this_year" => Ok(Period::ThisYear),
            "last_year" => Ok(Period::LastYear),
            _ => Err(format!("Unknown period: {}", s)),
        }
    }
}

/// A reference point for relative-date arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Today,
    Yesterday,
    StartOfWeek,
    EndOfWeek,
    StartOfMonth,
    EndOfMonth,
}

impl std::str::FromStr for Reference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "today" => Ok(Reference::Today),
            "yesterday" => Ok(Reference::Yesterday),
            "start_of_week" => Ok(Reference::StartOfWeek),
            "end_of_week" => Ok(Reference::EndOfWeek),
            "start_of_month" => Ok(Reference::StartOfMonth),
            "end_of_month" => Ok(Reference::EndOfMonth),
            _ => Err(format!("Unknown reference point: {}", s)),
        }
    }
}

/// A resolved date range in display and ISO forms.
#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
    pub iso_start_date: String,
    pub iso_end_date: String,
}

/// A single resolved date with calendar context.
#[derive(Debug, Clone, Serialize)]
pub struct RelativeDate {
    pub date: String,
    pub iso_date: String,
    pub day_of_week: String,
    pub month: String,
    pub year: i32,
}

/// Format the current date, optionally with time.
pub fn current_date(now: NaiveDateTime, include_time: bool) -> String {
    if include_time {
        now.format(ISO_FORMAT).to_string()
    } else {
        now.format(DISPLAY_FORMAT).to_string()
    }
}

/// Resolve a named period to its start and end dates relative to `now`.
pub fn date_range(period: Period, now: NaiveDateTime) -> DateRange {
    let today = now.date();

    let (start, end) = match period {
        Period::Today => (today, today),
        Period::Yesterday => {
            let d = today - Duration::days(1);
            (d, d)
        }
        Period::ThisWeek => {
            let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
            (monday, monday + Duration::days(6))
        }
        Period::LastWeek => {
            let monday =
                today - Duration::days(today.weekday().num_days_from_monday() as i64 + 7);
            (monday, monday + Duration::days(6))
        }
        Period::ThisMonth => (
            first_day_of_month(today.year(), today.month()),
            last_day_of_month(today.year(), today.month()),
        ),
        Period::LastMonth => {
            let prev = first_day_of_month(today.year(), today.month()) - Duration::days(1);
            (
                first_day_of_month(prev.year(), prev.month()),
                last_day_of_month(prev.year(), prev.month()),
            )
        }
        Period::NextMonth => {
            let next = last_day_of_month(today.year(), today.month()) + Duration::days(1);
            (
                first_day_of_month(next.year(), next.month()),
                last_day_of_month(next.year(), next.month()),
            )
        }
        Period::ThisYear => (
            first_day_of_month(today.year(), 1),
            last_day_of_month(today.year(), 12),
        ),
        Period::LastYear => (
            first_day_of_month(today.year() - 1, 1),
            last_day_of_month(today.year() - 1, 12),
        ),
    };

    let start_dt = start.and_time(NaiveTime::MIN);
    let end_dt = end_of_day(end);

    DateRange {
        start_date: start_dt.format(DISPLAY_FORMAT).to_string(),
        end_date: end_dt.format(DISPLAY_FORMAT).to_string(),
        iso_start_date: start_dt.format(ISO_FORMAT).to_string(),
        iso_end_date: end_dt.format(ISO_FORMAT).to_string(),
    }
}

/// Resolve a reference point plus a day offset to a single date.
pub fn relative_date(reference: Reference, offset_days: i64, now: NaiveDateTime) -> RelativeDate {
    let today = now.date();

    let base = match reference {
        Reference::Today => today,
        Reference::Yesterday => today - Duration::days(1),
        Reference::StartOfWeek => {
            today - Duration::days(today.weekday().num_days_from_monday() as i64)
        }
        Reference::EndOfWeek => {
            today + Duration::days(6 - today.weekday().num_days_from_monday() as i64)
        }
        Reference::StartOfMonth => first_day_of_month(today.year(), today.month()),
        Reference::EndOfMonth => last_day_of_month(today.year(), today.month()),
    };

    let result = base + Duration::days(offset_days);
    let result_dt = result.and_time(now.time());

    RelativeDate {
        date: result_dt.format(DISPLAY_FORMAT).to_string(),
        iso_date: result_dt.format(ISO_FORMAT).to_string(),
        day_of_week: result.format("%A").to_string(),
        month: result.format("%B").to_string(),
        year: result.year(),
    }
}

fn first_day_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("valid first of month")
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    first_day_of_month(next_year, next_month)
        .pred_opt()
        .expect("valid last of month")
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).expect("valid wall-clock time"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> NaiveDateTime {
        // Friday 2024-03-15, mid-afternoon
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_this_month_range() {
        let range = date_range(Period::ThisMonth, fixed_now());
        assert_eq!(range.start_date, "2024-03-01");
        assert_eq!(range.end_date, "2024-03-31");
        assert_eq!(range.iso_start_date, "2024-03-01T00:00:00Z");
        assert_eq!(range.iso_end_date, "2024-03-31T23:59:59Z");
    }

    #[test]
    fn test_last_month_crosses_year_boundary() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let range = date_range(Period::LastMonth, now);
        assert_eq!(range.start_date, "2023-12-01");
        assert_eq!(range.end_date, "2023-12-31");
    }

    #[test]
    fn test_next_month_crosses_year_boundary() {
        let now = NaiveDate::from_ymd_opt(2024, 12, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let range = date_range(Period::NextMonth, now);
        assert_eq!(range.start_date, "2025-01-01");
        assert_eq!(range.end_date, "2025-01-31");
    }

    #[test]
    fn test_weeks_start_on_monday() {
        // 2024-03-15 is a Friday; that week is Mon 11th .. Sun 17th
        let this_week = date_range(Period::ThisWeek, fixed_now());
        assert_eq!(this_week.start_date, "2024-03-11");
        assert_eq!(this_week.end_date, "2024-03-17");

        let last_week = date_range(Period::LastWeek, fixed_now());
        assert_eq!(last_week.start_date, "2024-03-04");
        assert_eq!(last_week.end_date, "2024-03-10");
    }

    #[test]
    fn test_leap_year_february() {
        let now = NaiveDate::from_ymd_opt(2024, 2, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let range = date_range(Period::ThisMonth, now);
        assert_eq!(range.end_date, "2024-02-29");
    }

    #[test]
    fn test_relative_date_with_offset() {
        let tomorrow = relative_date(Reference::Today, 1, fixed_now());
        assert_eq!(tomorrow.date, "2024-03-16");
        assert_eq!(tomorrow.day_of_week, "Saturday");
        assert_eq!(tomorrow.month, "March");
        assert_eq!(tomorrow.year, 2024);
    }

    #[test]
    fn test_relative_date_start_of_week_back_one_week() {
        let last_monday = relative_date(Reference::StartOfWeek, -7, fixed_now());
        assert_eq!(last_monday.date, "2024-03-04");
        assert_eq!(last_monday.day_of_week, "Monday");
    }

    #[test]
    fn test_relative_date_end_of_month() {
        let end = relative_date(Reference::EndOfMonth, 0, fixed_now());
        assert_eq!(end.date, "2024-03-31");
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("this_month".parse::<Period>().unwrap(), Period::ThisMonth);
        assert_eq!("LAST_WEEK".parse::<Period>().unwrap(), Period::LastWeek);
        assert!("fortnight".parse::<Period>().is_err());
    }

    #[test]
    fn test_current_date_formats() {
        assert_eq!(current_date(fixed_now(), false), "2024-03-15");
        assert_eq!(current_date(fixed_now(), true), "2024-03-15T14:30:00Z");
    }
}
