//! Input validation for scheduler forms and the events API

use chrono::{NaiveDate, NaiveTime};

use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{EventCategory, NewEvent};

/// A `NewEvent` whose fields have all been checked and parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEvent {
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub category: EventCategory,
    pub location: String,
    pub notes: String,
}

// ============================================================================
// Event Validations
// ============================================================================

/// Validate a creation request, naming the first offending field
pub fn validate_new_event(input: &NewEvent) -> SchedulerResult<ValidatedEvent> {
    let title = required_text("title", &input.title)?;
    let date = parse_date(&input.date)?;
    let time = parse_time(&input.time)?;
    let category = parse_category(&input.category)?;
    let location = required_text("location", &input.location)?;

    Ok(ValidatedEvent {
        title,
        date,
        time,
        category,
        location,
        notes: input.notes.as_deref().unwrap_or_default().trim().to_string(),
    })
}

/// Trimmed, non-empty text
pub fn required_text(field: &str, value: &str) -> SchedulerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SchedulerError::validation(field, format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> SchedulerResult<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SchedulerError::validation("date", "date is required"));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        SchedulerError::validation("date", format!("'{value}' is not a valid YYYY-MM-DD date"))
    })
}

/// Parse an `HH:MM` or `HH:MM:SS` time
pub fn parse_time(value: &str) -> SchedulerResult<NaiveTime> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SchedulerError::validation("time", "time is required"));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            SchedulerError::validation("time", format!("'{value}' is not a valid HH:MM time"))
        })
}

/// Parse a category name
pub fn parse_category(value: &str) -> SchedulerResult<EventCategory> {
    if value.trim().is_empty() {
        return Err(SchedulerError::validation("category", "category is required"));
    }
    value
        .parse::<EventCategory>()
        .map_err(|e| SchedulerError::validation("category", e.to_string()))
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && email.len() >= 5 => {
            Ok(())
        }
        _ => Err("Invalid email format"),
    }
}

/// Lower-cased, trimmed e-mail used as the user identifier
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
