use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::window::DateWindow;
use crate::db::models::TimeOffWindow;

/// A disjoint run of approved time off.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeOffSpan {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl TimeOffSpan {
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

impl DateWindow for TimeOffSpan {
    fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    fn end_date(&self) -> Option<NaiveDate> {
        Some(self.end_date)
    }
}

/// Coalesces approved windows into ascending, disjoint spans.
/// Windows that overlap or sit on consecutive days become one span.
pub fn merge_time_off(windows: &[TimeOffWindow]) -> Vec<TimeOffSpan> {
    let mut approved: Vec<TimeOffSpan> = windows
        .iter()
        .filter(|window| window.is_approved())
        .map(|window| TimeOffSpan {
            start_date: window.start_date,
            end_date: window.end_date,
        })
        .collect();
    approved.sort_by_key(|span| (span.start_date, span.end_date));

    let mut merged: Vec<TimeOffSpan> = Vec::with_capacity(approved.len());
    for span in approved {
        match merged.last_mut() {
            Some(current) if touches(current, &span) => {
                current.end_date = current.end_date.max(span.end_date);
            }
            _ => merged.push(span),
        }
    }

    merged
}

fn touches(current: &TimeOffSpan, next: &TimeOffSpan) -> bool {
    match current.end_date.succ_opt() {
        Some(day_after) => next.start_date <= day_after,
        None => true,
    }
}
