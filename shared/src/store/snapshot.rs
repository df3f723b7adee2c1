//! Snapshot encoding
//!
//! Current snapshots are `{"version": 1, "events": [...]}`. Older snapshots
//! are a bare array of loosely-shaped records (camelCase keys, display-name
//! categories, `{}` for missing weather, no derived fields); those go
//! through `StoredEvent`, which fills in whatever is missing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Event, EventCategory, PriorityLabel, WeatherSnapshot};
use crate::priority;
use crate::types::EventId;
use crate::validation::parse_time;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotOut<'a> {
    version: u32,
    events: Vec<&'a Event>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotIn {
    Versioned {
        #[allow(dead_code)]
        version: u32,
        events: Vec<Value>,
    },
    Legacy(Vec<Value>),
}

/// Serialize events in creation order
pub fn encode<'a>(events: impl Iterator<Item = &'a Event>) -> Result<String, serde_json::Error> {
    let mut events: Vec<&Event> = events.collect();
    events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    serde_json::to_string(&SnapshotOut {
        version: SNAPSHOT_VERSION,
        events,
    })
}

/// Split a snapshot document into raw records
pub fn decode(raw: &str) -> Result<Vec<Value>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(match serde_json::from_str::<SnapshotIn>(raw)? {
        SnapshotIn::Versioned { events, .. } => events,
        SnapshotIn::Legacy(events) => events,
    })
}

/// A persisted record, current or legacy
#[derive(Debug, Deserialize)]
pub struct StoredEvent {
    #[serde(default)]
    id: Option<Value>,
    title: String,
    date: NaiveDate,
    time: String,
    #[serde(alias = "taskType")]
    category: EventCategory,
    #[serde(default)]
    location: String,
    #[serde(default, alias = "description")]
    notes: Option<String>,
    #[serde(default)]
    weather: Option<Value>,
    #[serde(default)]
    priority_score: Option<u8>,
    #[serde(default)]
    priority_label: Option<PriorityLabel>,
    #[serde(default)]
    completed: bool,
    #[serde(default, alias = "createdAt")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt")]
    updated_at: Option<DateTime<Utc>>,
}

/// A record admitted into the store
pub struct Restored {
    pub event: Event,
    /// Derived fields had to be computed
    pub migrated: bool,
}

impl StoredEvent {
    pub fn from_value(value: Value) -> Result<Self, String> {
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    /// Build an `Event`, computing derived fields that are missing
    pub fn restore(self, now: NaiveDateTime) -> Result<Restored, String> {
        let time = parse_time(&self.time).map_err(|e| e.to_string())?;

        let id = match self.id {
            Some(Value::String(s)) if !s.trim().is_empty() => EventId::from(s),
            Some(Value::Number(n)) => EventId::from(n.to_string()),
            _ => EventId::generate(),
        };

        // Legacy records store `{}` when no weather was fetched
        let weather = self
            .weather
            .filter(|w| !w.is_null())
            .and_then(|w| serde_json::from_value::<WeatherSnapshot>(w).ok());

        let (priority_score, priority_label, migrated) = match self.priority_score {
            Some(score) if score <= priority::MAX_SCORE as u8 => {
                let label = priority::priority_label(score);
                (score, label, self.priority_label != Some(label))
            }
            _ => {
                let computed = priority::score(
                    self.category,
                    weather.as_ref(),
                    self.date.and_time(time),
                    now,
                );
                (computed.score, computed.label, true)
            }
        };

        let created_at = self.created_at.unwrap_or_else(Utc::now);

        Ok(Restored {
            event: Event {
                id,
                title: self.title,
                date: self.date,
                time,
                category: self.category,
                location: self.location,
                notes: self.notes.unwrap_or_default(),
                weather,
                priority_score,
                priority_label,
                completed: self.completed,
                created_at,
                updated_at: self.updated_at.unwrap_or(created_at),
            },
            migrated,
        })
    }
}
