//! Construction-time validation for resource records.
//!
//! Records that reach the aggregator or the database have already passed
//! these checks.

use chrono::{Datelike, NaiveDate, NaiveTime};
use thiserror::Error;

pub const MIN_ALLOCATION_PERCENTAGE: u32 = 1;
pub const MAX_ALLOCATION_PERCENTAGE: u32 = 100;

/// Stored dates are `%Y-%m-%d` text; only four-digit years keep text order
/// equal to date order.
pub const MIN_STORED_YEAR: i32 = 0;
pub const MAX_STORED_YEAR: i32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("allocation percentage {0} is outside 1..=100")]
    PercentageOutOfRange(u32),

    #[error("start date {start} is after end date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("date {0} is outside years 0000..=9999")]
    DateOutOfRange(NaiveDate),

    #[error("start time {start} must be before end time {end}")]
    InvertedTimeRange { start: NaiveTime, end: NaiveTime },

    #[error("day of week {0} is outside 0 (Sunday) ..= 6 (Saturday)")]
    InvalidDayOfWeek(u8),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("unknown time off status '{0}'")]
    UnknownStatus(String),

    #[error("unknown time off request type '{0}'")]
    UnknownRequestType(String),
}

pub fn validate_percentage(percentage: u32) -> Result<(), ValidationError> {
    if !(MIN_ALLOCATION_PERCENTAGE..=MAX_ALLOCATION_PERCENTAGE).contains(&percentage) {
        return Err(ValidationError::PercentageOutOfRange(percentage));
    }
    Ok(())
}

pub fn validate_stored_date(date: NaiveDate) -> Result<(), ValidationError> {
    if !(MIN_STORED_YEAR..=MAX_STORED_YEAR).contains(&date.year()) {
        return Err(ValidationError::DateOutOfRange(date));
    }
    Ok(())
}

pub fn validate_date_range(
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    validate_stored_date(start)?;
    if let Some(end) = end {
        validate_stored_date(end)?;
    }
    match end {
        Some(end) if start > end => Err(ValidationError::InvertedDateRange { start, end }),
        _ => Ok(()),
    }
}

pub fn validate_time_range(start: NaiveTime, end: NaiveTime) -> Result<(), ValidationError> {
    if start >= end {
        return Err(ValidationError::InvertedTimeRange { start, end });
    }
    Ok(())
}

pub fn validate_day_of_week(day_of_week: u8) -> Result<(), ValidationError> {
    if day_of_week > 6 {
        return Err(ValidationError::InvalidDayOfWeek(day_of_week));
    }
    Ok(())
}

pub fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}
