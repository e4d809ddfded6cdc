//! Time-off request data models.
//!
//! A request is a window of calendar days. Only approved requests count
//! as time off when building calendars.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require, validate_date_range, ValidationError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeOffStatus {
    Pending,
    Approved,
    Rejected,
}

impl TimeOffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOffStatus::Pending => "pending",
            TimeOffStatus::Approved => "approved",
            TimeOffStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for TimeOffStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(TimeOffStatus::Pending),
            "approved" => Ok(TimeOffStatus::Approved),
            "rejected" => Ok(TimeOffStatus::Rejected),
            other => Err(ValidationError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Vacation,
    Sick,
    Personal,
    Other,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Vacation => "vacation",
            RequestType::Sick => "sick",
            RequestType::Personal => "personal",
            RequestType::Other => "other",
        }
    }
}

impl FromStr for RequestType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "vacation" => Ok(RequestType::Vacation),
            "sick" => Ok(RequestType::Sick),
            "personal" => Ok(RequestType::Personal),
            "other" => Ok(RequestType::Other),
            other => Err(ValidationError::UnknownRequestType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeOffWindow {
    pub id: String,
    pub user_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: TimeOffStatus,
    pub request_type: RequestType,
    pub notes: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeOffWindow {
    /// Builds a new `pending` request.
    pub fn new(
        user_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        request_type: RequestType,
        notes: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let now = Utc::now();
        let window = Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            start_date,
            end_date,
            status: TimeOffStatus::Pending,
            request_type,
            notes: notes.into(),
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn with_status(mut self, status: TimeOffStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_approved(&self) -> bool {
        self.status == TimeOffStatus::Approved
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.user_id, "user_id")?;
        validate_date_range(self.start_date, Some(self.end_date))
    }
}

/// Input for submitting a time-off request from the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOffInput {
    pub user_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub request_type: RequestType,
    #[serde(default)]
    pub notes: String,
}

impl TryFrom<TimeOffInput> for TimeOffWindow {
    type Error = ValidationError;

    fn try_from(input: TimeOffInput) -> Result<Self, Self::Error> {
        TimeOffWindow::new(
            input.user_id,
            input.start_date,
            input.end_date,
            input.request_type,
            input.notes,
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOffFilter {
    pub user_id: Option<String>,
    pub status: Option<TimeOffStatus>,
}
