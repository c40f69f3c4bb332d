//! Date normalization
//!
//! Every date that crosses the store boundary is reduced to a canonical
//! `YYYY-MM-DD` day before it is used as part of a cell key. The store may
//! serialize `attendance_date` as a plain day, a timestamp (`2024-03-05T00:00:00Z`)
//! or a text timestamp (`2024-03-05 00:00:00+00`); all of them map to the same key.

use chrono::{Datelike, NaiveDate};

use crate::shared::error::SharedError;

/// Canonical day format used for keys and wire values.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Strip any time-of-day or timezone suffix and surrounding whitespace.
///
/// Total and pure: `None` yields an empty string. The result is not validated;
/// use [`parse_day`] when a usable key is required.
pub fn normalize(input: Option<&str>) -> String {
    let Some(raw) = input else {
        return String::new();
    };
    let trimmed = raw.trim();
    let day = trimmed
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or_default();
    day.trim().to_string()
}

/// Normalize a JSON value; anything other than a string yields an empty string.
pub fn normalize_value(value: &serde_json::Value) -> String {
    normalize(value.as_str())
}

/// Normalize and validate a day, failing fast on anything that is not a real
/// `YYYY-MM-DD` calendar date.
pub fn parse_day(input: &str) -> Result<NaiveDate, SharedError> {
    let day = normalize(Some(input));
    if day.len() != 10 {
        return Err(SharedError::invalid_date(input));
    }
    NaiveDate::parse_from_str(&day, DAY_FORMAT).map_err(|_| SharedError::invalid_date(input))
}

/// Render a day in canonical form.
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// All days of a calendar month, in order. `month` is 1-based.
pub fn days_of_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|day| day.month() == month)
        .collect()
}
