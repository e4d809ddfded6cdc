//! Weekly availability slots.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require, validate_day_of_week, validate_time_range, ValidationError};

/// A recurring working window on one weekday. `day_of_week` counts from
/// Sunday = 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAvailability {
    pub id: String,
    pub user_id: String,
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAvailability {
    pub fn new(
        user_id: impl Into<String>,
        day_of_week: u8,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self, ValidationError> {
        let now = Utc::now();
        let slot = Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            day_of_week,
            start_time,
            end_time,
            created_at: now,
            updated_at: now,
        };
        slot.validate()?;
        Ok(slot)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.user_id, "user_id")?;
        validate_day_of_week(self.day_of_week)?;
        validate_time_range(self.start_time, self.end_time)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Same weekday and sharing at least one minute. Back-to-back slots
    /// (one ends when the other starts) do not overlap.
    pub fn overlaps(&self, other: &UserAvailability) -> bool {
        self.day_of_week == other.day_of_week
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityInput {
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}
