use chrono::NaiveDate;

use crate::db::models::{Allocation, TimeOffWindow};

/// Anything that covers an inclusive span of calendar days.
pub trait DateWindow {
    fn start_date(&self) -> NaiveDate;

    /// `None` means the window is open-ended.
    fn end_date(&self) -> Option<NaiveDate>;

    fn is_active(&self, day: NaiveDate) -> bool {
        day >= self.start_date() && self.end_date().map_or(true, |end| day <= end)
    }

    /// True when the window shares at least one day with `[start, end]`.
    fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date() <= end && self.end_date().map_or(true, |own_end| own_end >= start)
    }
}

pub fn is_active<W: DateWindow + ?Sized>(window: &W, day: NaiveDate) -> bool {
    window.is_active(day)
}

impl DateWindow for Allocation {
    fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }
}

impl DateWindow for TimeOffWindow {
    fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    fn end_date(&self) -> Option<NaiveDate> {
        Some(self.end_date)
    }
}
