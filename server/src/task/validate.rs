use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::TaskStatus;

/// A rejected task field. The display strings are part of the API contract
/// and are returned verbatim in error responses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskValidationError {
    #[error("Title must be between 1 and 100 characters")]
    InvalidTitle,
    #[error("Description is required and must be a non-empty string")]
    InvalidDescription,
    #[error("Invalid status value")]
    InvalidStatus,
    #[error("Priority must be an integer between 1 and 5")]
    InvalidPriority,
    #[error("Invalid due date format")]
    InvalidDueDateFormat,
    #[error("Due date must be in the future")]
    DueDateNotInFuture,
    #[error("Invalid assignedTo user ID")]
    InvalidAssigneeId,
    #[error("Assigned user does not exist")]
    AssigneeNotFound,
}

/// Validates a task title: a string whose trimmed length is between 1 and
/// 100 characters. Non-string values fail like empty strings.
///
/// # Returns
///
/// The trimmed title on success.
pub fn validate_title(value: &Value) -> Result<String, TaskValidationError> {
    let title = value.as_str().ok_or(TaskValidationError::InvalidTitle)?;
    let trimmed = title.trim();
    let length = trimmed.chars().count();
    if length == 0 || length > 100 {
        return Err(TaskValidationError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

/// Validates a task description: a string that is non-empty after trimming.
/// Non-string values fail like empty strings.
///
/// # Returns
///
/// The trimmed description on success.
pub fn validate_description(value: &Value) -> Result<String, TaskValidationError> {
    let description = value
        .as_str()
        .ok_or(TaskValidationError::InvalidDescription)?;
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::InvalidDescription);
    }
    Ok(trimmed.to_string())
}

/// Validates a task status against the known enum values.
pub fn validate_status(value: &Value) -> Result<TaskStatus, TaskValidationError> {
    match value.as_str() {
        Some("todo") => Ok(TaskStatus::Todo),
        Some("in_progress") => Ok(TaskStatus::InProgress),
        Some("completed") => Ok(TaskStatus::Completed),
        _ => Err(TaskValidationError::InvalidStatus),
    }
}

/// Validates a task priority: a JSON integer between 1 and 5.
/// Floats and numeric strings are rejected.
pub fn validate_priority(value: &Value) -> Result<i32, TaskValidationError> {
    let priority = value.as_i64().ok_or(TaskValidationError::InvalidPriority)?;
    if !(1..=5).contains(&priority) {
        return Err(TaskValidationError::InvalidPriority);
    }
    Ok(priority as i32)
}

/// Validates a due date: it must parse to a timestamp, and that timestamp
/// must be strictly later than `now`. The two failures carry distinct
/// messages.
///
/// # Returns
///
/// The parsed timestamp on success.
pub fn validate_due_date(
    value: &Value,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, TaskValidationError> {
    let parsed = parse_due_date(value).ok_or(TaskValidationError::InvalidDueDateFormat)?;
    if parsed <= now {
        return Err(TaskValidationError::DueDateNotInFuture);
    }
    Ok(parsed)
}

/// Parses a raw due date value: an RFC 3339 string, a bare `YYYY-MM-DD`
/// date (midnight UTC), a naive `YYYY-MM-DDTHH:MM:SS` datetime (UTC), or a
/// JSON number holding a millisecond epoch.
fn parse_due_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => {
            if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
                return Some(timestamp.with_timezone(&Utc));
            }
            if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
            }
            if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
                return Some(Utc.from_utc_datetime(&datetime));
            }
            None
        }
        Value::Number(number) => {
            let millis = number.as_i64()?;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

/// Validates an assignedTo identifier: a string parsing as a UUID.
/// Purely syntactic; existence against the user store is checked separately.
pub fn validate_assignee_id(value: &Value) -> Result<Uuid, TaskValidationError> {
    let raw = value
        .as_str()
        .ok_or(TaskValidationError::InvalidAssigneeId)?;
    Uuid::parse_str(raw).map_err(|_| TaskValidationError::InvalidAssigneeId)
}
