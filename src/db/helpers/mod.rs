use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

use crate::db::models::validation::{MAX_STORED_YEAR, MIN_STORED_YEAR};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn to_u8(value: i64, field: &str) -> Result<u8> {
    u8::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Formats a range-query bound, clamped to the years stored dates can take so
/// text comparison against stored columns still orders correctly.
pub fn format_date_bound(date: NaiveDate) -> String {
    if date.year() > MAX_STORED_YEAR {
        format!("{MAX_STORED_YEAR:04}-12-31")
    } else if date.year() < MIN_STORED_YEAR {
        format!("{MIN_STORED_YEAR:04}-01-01")
    } else {
        format_date(date)
    }
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

pub fn parse_optional_date(value: Option<String>, field: &str) -> Result<Option<NaiveDate>> {
    match value {
        Some(raw) => parse_date(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn parse_time(value: &str, field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

/// `?, ?, ?` with `count` placeholders for `IN (...)` clauses.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
