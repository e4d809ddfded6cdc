use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::day::DayAggregate;
use super::range::aggregate_range;
use crate::db::models::{Allocation, TimeOffWindow, UserAvailability};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserCalendar {
    pub user_id: String,
    pub days: Vec<DayAggregate>,
}

/// Builds one calendar per user, in the order the ids were given.
/// Each calendar only sees that user's allocations and time off.
pub fn aggregate_users_range(
    allocations: &[Allocation],
    time_off: &[TimeOffWindow],
    user_ids: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<UserCalendar> {
    user_ids
        .iter()
        .map(|user_id| {
            let own_allocations: Vec<Allocation> = allocations
                .iter()
                .filter(|allocation| &allocation.user_id == user_id)
                .cloned()
                .collect();
            let own_time_off: Vec<TimeOffWindow> = time_off
                .iter()
                .filter(|window| &window.user_id == user_id)
                .cloned()
                .collect();

            UserCalendar {
                user_id: user_id.clone(),
                days: aggregate_range(&own_allocations, &own_time_off, start, end).collect(),
            }
        })
        .collect()
}

/// Weekly slots that apply to `day`, earliest first.
pub fn availability_for_day(
    availability: &[UserAvailability],
    day: NaiveDate,
) -> Vec<&UserAvailability> {
    let weekday = day.weekday().num_days_from_sunday() as u8;
    let mut slots: Vec<&UserAvailability> = availability
        .iter()
        .filter(|slot| slot.day_of_week == weekday)
        .collect();
    slots.sort_by_key(|slot| slot.start_time);
    slots
}

pub fn available_minutes(availability: &[UserAvailability], day: NaiveDate) -> i64 {
    availability_for_day(availability, day)
        .iter()
        .map(|slot| slot.duration_minutes())
        .sum()
}
