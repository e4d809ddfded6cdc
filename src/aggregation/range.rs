use std::iter::FusedIterator;

use chrono::NaiveDate;

use super::day::{aggregate_day, DayAggregate};
use crate::db::models::{Allocation, TimeOffWindow};

/// Lazy per-day aggregates over an inclusive calendar range.
///
/// Every calendar day is yielded in ascending order, weekends included.
/// Clone the iterator to walk the same range again.
#[derive(Debug, Clone)]
pub struct DayRange<'a> {
    allocations: &'a [Allocation],
    time_off: &'a [TimeOffWindow],
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl<'a> DayRange<'a> {
    fn remaining(&self) -> usize {
        match self.next {
            Some(day) if day <= self.end => (self.end - day).num_days() as usize + 1,
            _ => 0,
        }
    }
}

impl Iterator for DayRange<'_> {
    type Item = DayAggregate;

    fn next(&mut self) -> Option<Self::Item> {
        let day = self.next.filter(|day| *day <= self.end)?;
        self.next = day.succ_opt();
        Some(aggregate_day(self.allocations, self.time_off, day))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DayRange<'_> {}

impl FusedIterator for DayRange<'_> {}

/// Aggregates every day in `[start, end]`. An inverted range is empty.
pub fn aggregate_range<'a>(
    allocations: &'a [Allocation],
    time_off: &'a [TimeOffWindow],
    start: NaiveDate,
    end: NaiveDate,
) -> DayRange<'a> {
    DayRange {
        allocations,
        time_off,
        next: Some(start),
        end,
    }
}

pub fn overallocated_days(
    allocations: &[Allocation],
    time_off: &[TimeOffWindow],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DayAggregate> {
    aggregate_range(allocations, time_off, start, end)
        .filter(|day| day.overallocated)
        .collect()
}
