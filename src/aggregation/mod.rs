pub mod calendar;
pub mod day;
pub mod merge;
pub mod range;
pub mod window;

pub use calendar::{aggregate_users_range, availability_for_day, available_minutes, UserCalendar};
pub use day::{aggregate_day, DayAggregate, ProjectShare, OVERALLOCATION_THRESHOLD};
pub use merge::{merge_time_off, TimeOffSpan};
pub use range::{aggregate_range, overallocated_days, DayRange};
pub use window::{is_active, DateWindow};
