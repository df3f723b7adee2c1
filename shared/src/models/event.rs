//! Scheduled event models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::WeatherSnapshot;
use crate::types::EventId;

/// A user-scheduled event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub category: EventCategory,
    pub location: String,
    pub notes: String,
    pub weather: Option<WeatherSnapshot>,
    /// Derived from category, weather and schedule; never set by callers
    pub priority_score: u8,
    pub priority_label: PriorityLabel,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Local wall-clock instant the event is scheduled for
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// Kind of event, each carrying an intrinsic base weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    #[serde(alias = "Emergency")]
    Emergency,
    #[serde(alias = "Medical")]
    Medical,
    #[serde(alias = "Construction")]
    Construction,
    #[serde(alias = "Outdoor Work")]
    OutdoorWork,
    #[serde(alias = "Garden Maintenance")]
    GardenMaintenance,
    #[serde(alias = "Travel")]
    Travel,
    #[serde(alias = "Sports")]
    Sports,
    #[serde(alias = "Exercise")]
    Exercise,
    #[serde(alias = "Meeting")]
    Meeting,
    #[serde(alias = "Social Event")]
    SocialEvent,
    #[serde(alias = "Shopping")]
    Shopping,
    #[serde(alias = "Indoor Work")]
    IndoorWork,
    #[serde(alias = "Study")]
    Study,
}

impl EventCategory {
    pub const ALL: [EventCategory; 13] = [
        EventCategory::Emergency,
        EventCategory::Medical,
        EventCategory::Construction,
        EventCategory::OutdoorWork,
        EventCategory::GardenMaintenance,
        EventCategory::Travel,
        EventCategory::Sports,
        EventCategory::Exercise,
        EventCategory::Meeting,
        EventCategory::SocialEvent,
        EventCategory::Shopping,
        EventCategory::IndoorWork,
        EventCategory::Study,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Emergency => "emergency",
            EventCategory::Medical => "medical",
            EventCategory::Construction => "construction",
            EventCategory::OutdoorWork => "outdoor_work",
            EventCategory::GardenMaintenance => "garden_maintenance",
            EventCategory::Travel => "travel",
            EventCategory::Sports => "sports",
            EventCategory::Exercise => "exercise",
            EventCategory::Meeting => "meeting",
            EventCategory::SocialEvent => "social_event",
            EventCategory::Shopping => "shopping",
            EventCategory::IndoorWork => "indoor_work",
            EventCategory::Study => "study",
        }
    }

    /// Human-readable name, as shown in the scheduler form
    pub fn display_name(&self) -> &'static str {
        match self {
            EventCategory::Emergency => "Emergency",
            EventCategory::Medical => "Medical",
            EventCategory::Construction => "Construction",
            EventCategory::OutdoorWork => "Outdoor Work",
            EventCategory::GardenMaintenance => "Garden Maintenance",
            EventCategory::Travel => "Travel",
            EventCategory::Sports => "Sports",
            EventCategory::Exercise => "Exercise",
            EventCategory::Meeting => "Meeting",
            EventCategory::SocialEvent => "Social Event",
            EventCategory::Shopping => "Shopping",
            EventCategory::IndoorWork => "Indoor Work",
            EventCategory::Study => "Study",
        }
    }
}

/// Error returned when a category name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for EventCategory {
    type Err = UnknownCategory;

    /// Accepts `outdoor_work`, `Outdoor Work`, `outdoor-work` and any casing
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        EventCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Categorical bucket of a priority score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLabel {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLabel::VeryLow => "very_low",
            PriorityLabel::Low => "low",
            PriorityLabel::Medium => "medium",
            PriorityLabel::High => "high",
            PriorityLabel::Critical => "critical",
        }
    }
}

impl fmt::Display for PriorityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating an event
///
/// Date, time and category arrive as raw form strings and are validated by
/// the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEvent {
    #[serde(default)]
    pub title: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: String,
    /// `HH:MM` or `HH:MM:SS`
    #[serde(default)]
    pub time: String,
    #[serde(default, alias = "taskType")]
    pub category: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "description")]
    pub notes: Option<String>,
}

/// Partial update of an event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(alias = "taskType")]
    pub category: Option<String>,
    pub location: Option<String>,
    #[serde(alias = "description")]
    pub notes: Option<String>,
    pub completed: Option<bool>,
    /// Fetch weather again even if location and schedule are unchanged
    #[serde(default)]
    pub refresh_weather: bool,
}

impl EventPatch {
    pub fn completed() -> Self {
        Self {
            completed: Some(true),
            ..Default::default()
        }
    }
}

/// Aggregate counts over a user's events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high_priority: usize,
    pub today: usize,
}
