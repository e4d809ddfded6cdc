//! Resource allocation data models.
//!
//! An allocation assigns a user to a project (optionally a single task) for a
//! percentage of their time between two calendar dates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require, validate_date_range, validate_percentage, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub task_id: Option<String>,
    pub allocation_percentage: u32,
    pub start_date: NaiveDate,
    /// `None` means the allocation never ends.
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Allocation {
    pub fn new(
        user_id: impl Into<String>,
        project_id: impl Into<String>,
        allocation_percentage: u32,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, ValidationError> {
        let now = Utc::now();
        let allocation = Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            project_id: project_id.into(),
            task_id: None,
            allocation_percentage,
            start_date,
            end_date,
            created_at: now,
            updated_at: now,
        };
        allocation.validate()?;
        Ok(allocation)
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.user_id, "user_id")?;
        require(&self.project_id, "project_id")?;
        validate_percentage(self.allocation_percentage)?;
        validate_date_range(self.start_date, self.end_date)
    }
}

/// Input for creating or updating an allocation from the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationInput {
    pub user_id: String,
    pub project_id: String,
    pub task_id: Option<String>,
    pub allocation_percentage: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl TryFrom<AllocationInput> for Allocation {
    type Error = ValidationError;

    fn try_from(input: AllocationInput) -> Result<Self, Self::Error> {
        let allocation = Allocation::new(
            input.user_id,
            input.project_id,
            input.allocation_percentage,
            input.start_date,
            input.end_date,
        )?;
        Ok(match input.task_id {
            Some(task_id) => allocation.with_task(task_id),
            None => allocation,
        })
    }
}

/// Fields of an allocation that may change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationUpdate {
    pub task_id: Option<String>,
    pub allocation_percentage: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl Allocation {
    /// Applies `update` to a copy, validating the result.
    pub fn updated(&self, update: AllocationUpdate) -> Result<Self, ValidationError> {
        let allocation = Self {
            task_id: update.task_id,
            allocation_percentage: update.allocation_percentage,
            start_date: update.start_date,
            end_date: update.end_date,
            ..self.clone()
        };
        allocation.validate()?;
        Ok(allocation)
    }
}

/// Filters for listing allocations; `None` fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationFilter {
    pub user_id: Option<String>,
    pub project_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn new_rejects_zero_percentage() {
        let err = Allocation::new("u1", "p1", 0, date("2025-01-01"), None).unwrap_err();
        assert_eq!(err, ValidationError::PercentageOutOfRange(0));
    }

    #[test]
    fn new_rejects_inverted_dates() {
        let err = Allocation::new("u1", "p1", 50, date("2025-02-01"), Some(date("2025-01-01")))
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvertedDateRange { .. }));
    }

    #[test]
    fn new_rejects_missing_project() {
        let err = Allocation::new("u1", "", 50, date("2025-01-01"), None).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("project_id"));
    }

    #[test]
    fn input_conversion_keeps_task() {
        let input = AllocationInput {
            user_id: "u1".into(),
            project_id: "p1".into(),
            task_id: Some("t9".into()),
            allocation_percentage: 40,
            start_date: date("2025-01-01"),
            end_date: None,
        };
        let allocation = Allocation::try_from(input).unwrap();
        assert_eq!(allocation.task_id.as_deref(), Some("t9"));
        assert_eq!(allocation.end_date, None);
    }

    #[test]
    fn update_keeps_owner_and_revalidates() {
        let original = Allocation::new("u1", "p1", 40, date("2025-01-01"), None).unwrap();
        let update = AllocationUpdate {
            task_id: None,
            allocation_percentage: 80,
            start_date: date("2025-01-01"),
            end_date: Some(date("2025-06-30")),
        };
        let updated = original.updated(update.clone()).unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.user_id, "u1");
        assert_eq!(updated.allocation_percentage, 80);

        let bad = AllocationUpdate {
            allocation_percentage: 101,
            ..update
        };
        assert_eq!(
            original.updated(bad).unwrap_err(),
            ValidationError::PercentageOutOfRange(101)
        );
    }

    #[test]
    fn serializes_camel_case_dates() {
        let allocation =
            Allocation::new("u1", "p1", 60, date("2025-01-01"), Some(date("2025-01-10"))).unwrap();
        let json = serde_json::to_value(&allocation).unwrap();
        assert_eq!(json["allocationPercentage"], 60);
        assert_eq!(json["startDate"], "2025-01-01");
        assert_eq!(json["endDate"], "2025-01-10");
    }
}
