//! Local calendar-date helpers.
//!
//! Dates are `NaiveDate` throughout: "2025-06-30" is the same calendar day in
//! every timezone, and no arithmetic here ever goes through a timestamp.

use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Today's date in the local timezone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` local date.
///
/// A trailing time part (`2025-06-30T08:00:00Z`) is ignored so ISO timestamps
/// from the host resolve to their calendar day. Anything else is `None`.
pub fn parse_local(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = match s.find(['T', ' ']) {
        Some(pos) => &s[..pos],
        None => s,
    };
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Parse an optional raw date field; missing and malformed are both `None`
pub fn parse_opt(s: Option<&str>) -> Option<NaiveDate> {
    s.and_then(parse_local)
}

/// Format as `YYYY-MM-DD`
pub fn format(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Shift by a signed number of days, saturating at the calendar limits
pub fn add_days(d: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        d.checked_add_days(magnitude)
    } else {
        d.checked_sub_days(magnitude)
    };
    shifted.unwrap_or(if days >= 0 { NaiveDate::MAX } else { NaiveDate::MIN })
}

/// Shift by whole months; the day is clamped to the target month's length
pub fn add_months(d: NaiveDate, months: u32) -> NaiveDate {
    d.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Number of days from `a` to `b` (negative when `b` is earlier)
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

pub fn year_start(d: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(d.year(), 1, 1).unwrap_or(d)
}

/// First day of the quarter containing `d`
pub fn quarter_start(d: NaiveDate) -> NaiveDate {
    let month = (d.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(d.year(), month, 1).unwrap_or(d)
}

/// Quarter number, 1-4
pub fn quarter_of(d: NaiveDate) -> u32 {
    d.month0() / 3 + 1
}

pub fn month_start(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}

/// The Monday on or before `d`
pub fn week_start(d: NaiveDate) -> NaiveDate {
    let back = d.weekday().num_days_from_monday() as i64;
    add_days(d, -back)
}

pub fn is_monday(d: NaiveDate) -> bool {
    d.weekday() == Weekday::Mon
}
