//! Event CRUD service backed by PostgreSQL
//!
//! Rows carry a caller-supplied `weather_priority` rank where lower means
//! more important; the prioritized view drains a min-heap keyed on it.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use shared::{HeapItem, PriorityHeap};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};

/// Column default for rows inserted without a rank
pub const DEFAULT_WEATHER_PRIORITY: i32 = 4;

const MISSING_FIELDS: &str = "Missing required event fields.";

/// Event service
#[derive(Clone)]
pub struct EventService {
    db: PgPool,
}

/// A row of the `events` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRow {
    pub id: i32,
    pub user_email: String,
    pub name: String,
    pub location: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
    pub weather_priority: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
}

impl EventRow {
    pub fn effective_priority(&self) -> i32 {
        self.weather_priority.unwrap_or(DEFAULT_WEATHER_PRIORITY)
    }
}

impl HeapItem for EventRow {
    type Id = i32;

    fn heap_id(&self) -> i32 {
        self.id
    }

    fn heap_key(&self) -> i64 {
        i64::from(self.effective_priority())
    }
}

/// Body of `POST /api/events`
#[derive(Debug, Default, Deserialize)]
pub struct CreateEventInput {
    pub user_email: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub notes: Option<String>,
    pub weather_priority: Option<i32>,
}

/// Checked `CreateEventInput`
#[derive(Debug, Clone, PartialEq)]
pub struct NewEventRow {
    pub user_email: String,
    pub name: String,
    pub location: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
    pub weather_priority: i32,
}

/// Prioritized view of a user's events
#[derive(Debug, Clone, Serialize)]
pub struct PrioritizedEvents {
    pub prioritized: Vec<EventRow>,
    #[serde(rename = "mapLookup")]
    pub map_lookup: Option<EventRow>,
}

fn required(value: &Option<String>) -> AppResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::bad_request(MISSING_FIELDS))
}

impl CreateEventInput {
    /// All fields but `notes` must be present and non-empty; a rank of 0 is valid
    pub fn validate(&self) -> AppResult<NewEventRow> {
        let user_email = shared::normalize_email(&required(&self.user_email)?);
        let name = required(&self.name)?;
        let location = required(&self.location)?;
        let date = required(&self.date)?;
        let time = required(&self.time)?;
        let weather_priority = self
            .weather_priority
            .ok_or_else(|| AppError::bad_request(MISSING_FIELDS))?;

        let date = shared::parse_date(&date)?;
        let time = shared::parse_time(&time)?;

        Ok(NewEventRow {
            user_email,
            name,
            location,
            date,
            time,
            notes: self.notes.clone(),
            weather_priority,
        })
    }
}

/// Order rows by ascending `weather_priority`; equal ranks keep input order
pub fn prioritize(rows: Vec<EventRow>) -> PrioritizedEvents {
    let by_id: HashMap<i32, EventRow> = rows.iter().map(|row| (row.id, row.clone())).collect();

    let mut heap = PriorityHeap::min();
    heap.extend(rows);
    let prioritized = heap.into_sorted_vec();

    let map_lookup = prioritized.first().and_then(|first| by_id.get(&first.id).cloned());

    PrioritizedEvents {
        prioritized,
        map_lookup,
    }
}

impl EventService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: NewEventRow) -> AppResult<EventRow> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events (user_email, name, location, date, time, notes, weather_priority)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&input.user_email)
        .bind(&input.name)
        .bind(&input.location)
        .bind(input.date)
        .bind(input.time)
        .bind(&input.notes)
        .bind(input.weather_priority)
        .fetch_one(&self.db)
        .await?;

        tracing::debug!(event_id = row.id, user_email = %row.user_email, "Event row created");
        Ok(row)
    }

    pub async fn list_for_user(&self, email: &str) -> AppResult<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT * FROM events WHERE user_email = $1 ORDER BY id",
        )
        .bind(email)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn prioritized_for_user(&self, email: &str) -> AppResult<PrioritizedEvents> {
        Ok(prioritize(self.list_for_user(email).await?))
    }

    /// Delete a row owned by `email`
    pub async fn delete(&self, id: i32, email: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND user_email = $2")
            .bind(id)
            .bind(email)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(event_id = id, user_email = email, "Delete matched no owned event");
            return Err(AppError::NotFound("Event not found or access denied".to_string()));
        }

        Ok(())
    }
}
