//! Event store
//!
//! Sole owner of a user's events. Keeps the id index and the priority heap
//! in lockstep, recomputes derived priority fields, and writes the full
//! event list to a key-value store after every mutation.
//!
//! Weather enrichment and persistence are best-effort: a failed weather
//! lookup yields an event without weather, and a failed write is reported
//! through `Mutation::persistence_warning` without rolling back the change.

mod snapshot;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

pub use snapshot::SNAPSHOT_VERSION;

use crate::clock::{Clock, SystemClock};
use crate::enrichment::{EnrichmentError, WeatherProvider};
use crate::error::{SchedulerError, SchedulerResult};
use crate::heap::{HeapItem, PriorityHeap};
use crate::index::EventIndex;
use crate::models::{Event, EventPatch, EventStats, NewEvent, WeatherSnapshot};
use crate::priority;
use crate::storage::{KeyValueStore, PersistenceError};
use crate::types::{EventId, Mutation};
use crate::validation::{parse_category, parse_date, parse_time, required_text, validate_new_event};

/// Default bound on a single weather lookup
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for an `EventStore`
#[derive(Clone)]
pub struct StoreOptions {
    pub enrichment_timeout: Duration,
    pub clock: Arc<dyn Clock>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            enrichment_timeout: DEFAULT_ENRICHMENT_TIMEOUT,
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("enrichment_timeout", &self.enrichment_timeout)
            .finish_non_exhaustive()
    }
}

/// Heap entry: the id plus the key it is ranked by
#[derive(Debug, Clone)]
struct RankedEvent {
    id: EventId,
    score: u8,
}

impl From<&Event> for RankedEvent {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            score: event.priority_score,
        }
    }
}

impl HeapItem for RankedEvent {
    type Id = EventId;

    fn heap_id(&self) -> EventId {
        self.id.clone()
    }

    fn heap_key(&self) -> i64 {
        i64::from(self.score)
    }
}

/// Per-user event store
pub struct EventStore {
    user_id: String,
    storage_key: String,
    storage: Arc<dyn KeyValueStore>,
    weather: Arc<dyn WeatherProvider>,
    options: StoreOptions,
    index: EventIndex,
    heap: PriorityHeap<RankedEvent>,
}

impl EventStore {
    /// Key under which a user's snapshot is stored
    pub fn storage_key(user_id: &str) -> String {
        format!("events_{user_id}")
    }

    /// Open the store for `user_id`, loading any existing snapshot
    ///
    /// A missing, unreadable or malformed snapshot yields an empty store.
    pub fn open(
        user_id: impl Into<String>,
        storage: Arc<dyn KeyValueStore>,
        weather: Arc<dyn WeatherProvider>,
        options: StoreOptions,
    ) -> Self {
        let user_id = user_id.into();
        let mut store = Self {
            storage_key: Self::storage_key(&user_id),
            user_id,
            storage,
            weather,
            options,
            index: EventIndex::new(),
            heap: PriorityHeap::max(),
        };
        store.load();
        store
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Validate, enrich, score and insert a new event
    pub async fn add_event(&mut self, input: NewEvent) -> SchedulerResult<Mutation<Event>> {
        let valid = validate_new_event(&input)?;
        let scheduled_at = valid.date.and_time(valid.time);

        let weather = self.enrich(&valid.location, scheduled_at).await;
        let priority = priority::score(valid.category, weather.as_ref(), scheduled_at, self.now());

        let created_at = Utc::now();
        let event = Event {
            id: EventId::generate(),
            title: valid.title,
            date: valid.date,
            time: valid.time,
            category: valid.category,
            location: valid.location,
            notes: valid.notes,
            weather,
            priority_score: priority.score,
            priority_label: priority.label,
            completed: false,
            created_at,
            updated_at: created_at,
        };

        self.admit(event.clone());
        debug!(
            user_id = %self.user_id,
            event_id = %event.id,
            score = event.priority_score,
            label = %event.priority_label,
            has_weather = event.weather.is_some(),
            "Event added"
        );

        Ok(Mutation {
            value: event,
            persistence_warning: self.persist(),
        })
    }

    /// Merge `patch` into an existing event
    ///
    /// Weather is fetched again when the location or schedule changes, or
    /// when `patch.refresh_weather` is set.
    pub async fn update_event(
        &mut self,
        id: &EventId,
        patch: EventPatch,
    ) -> SchedulerResult<Mutation<Event>> {
        let current = self.require(id)?.clone();
        let mut merged = merge_patch(&current, &patch)?;

        let moved = merged.location != current.location
            || merged.scheduled_at() != current.scheduled_at();
        if moved || patch.refresh_weather {
            merged.weather = self.enrich(&merged.location, merged.scheduled_at()).await;
        }

        Ok(self.commit_update(&current, merged))
    }

    /// Mark an event as completed; repeated calls are harmless
    pub fn mark_completed(&mut self, id: &EventId) -> SchedulerResult<Mutation<Event>> {
        let current = self.require(id)?.clone();
        let merged = merge_patch(&current, &EventPatch::completed())?;
        Ok(self.commit_update(&current, merged))
    }

    /// Remove an event from the index and the heap
    pub fn delete_event(&mut self, id: &EventId) -> SchedulerResult<Mutation<()>> {
        self.require(id)?;

        self.index.remove(id);
        self.heap.remove_by_id(id);
        debug!(user_id = %self.user_id, event_id = %id, "Event deleted");

        Ok(Mutation {
            value: (),
            persistence_warning: self.persist(),
        })
    }

    /// Drop every event, including the persisted snapshot contents
    pub fn clear_all(&mut self) -> Mutation<()> {
        let removed = self.index.len();
        self.index.clear();
        self.heap.clear();
        info!(user_id = %self.user_id, removed, "Cleared all events");

        Mutation {
            value: (),
            persistence_warning: self.persist(),
        }
    }

    /// Recompute every score against the current clock
    ///
    /// Time urgency drifts as events approach; this brings stored scores up
    /// to date. Returns how many events changed score.
    pub fn refresh_priorities(&mut self) -> Mutation<usize> {
        let now = self.now();
        let ids: Vec<EventId> = self.index.ids().cloned().collect();
        let mut changed = 0;

        for id in ids {
            let Some(event) = self.index.get_mut(&id) else {
                continue;
            };
            let fresh = priority::score(event.category, event.weather.as_ref(), event.scheduled_at(), now);
            if fresh.score != event.priority_score || fresh.label != event.priority_label {
                event.priority_score = fresh.score;
                event.priority_label = fresh.label;
                let ranked = RankedEvent::from(&*event);
                self.heap.insert(ranked);
                changed += 1;
            }
        }

        debug!(user_id = %self.user_id, changed, "Priorities refreshed");
        Mutation {
            value: changed,
            persistence_warning: self.persist(),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get_by_id(&self, id: &EventId) -> Option<&Event> {
        self.index.get(id)
    }

    /// Events ordered by schedule
    pub fn get_all(&self, include_completed: bool) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .index
            .values()
            .filter(|e| include_completed || !e.completed)
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            a.scheduled_at()
                .cmp(&b.scheduled_at())
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        events
    }

    /// Events from highest to lowest priority; the heap itself is untouched
    pub fn get_by_priority_order(&self, include_completed: bool) -> Vec<Event> {
        self.heap
            .drain_ordered()
            .into_iter()
            .filter_map(|ranked| self.index.get(&ranked.id))
            .filter(|e| include_completed || !e.completed)
            .cloned()
            .collect()
    }

    /// The heap root, completed or not
    pub fn peek_top(&self) -> Option<&Event> {
        self.heap.peek().and_then(|ranked| self.index.get(&ranked.id))
    }

    /// Highest-priority event that is still pending
    pub fn next_priority_event(&self) -> Option<Event> {
        self.get_by_priority_order(false).into_iter().next()
    }

    /// Events scheduled on `date`, ordered by time
    pub fn get_by_date(&self, date: NaiveDate) -> Vec<Event> {
        self.get_all(true)
            .into_iter()
            .filter(|e| e.date == date)
            .collect()
    }

    pub fn get_stats(&self) -> EventStats {
        let today = self.now().date();
        self.index.values().fold(EventStats::default(), |mut stats, e| {
            stats.total += 1;
            if e.completed {
                stats.completed += 1;
            } else {
                stats.pending += 1;
            }
            if e.priority_score >= priority::HIGH_THRESHOLD {
                stats.high_priority += 1;
            }
            if e.date == today {
                stats.today += 1;
            }
            stats
        })
    }

    /// Ids and keys straight from the heap's backing array
    #[cfg(test)]
    pub(crate) fn heap_entries(&self) -> Vec<(EventId, u8)> {
        self.heap
            .to_vec()
            .into_iter()
            .map(|ranked| (ranked.id, ranked.score))
            .collect()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn now(&self) -> NaiveDateTime {
        self.options.clock.now()
    }

    fn require(&self, id: &EventId) -> SchedulerResult<&Event> {
        self.index
            .get(id)
            .ok_or_else(|| SchedulerError::NotFound(id.clone()))
    }

    fn admit(&mut self, event: Event) {
        self.heap.insert(RankedEvent::from(&event));
        self.index.insert(event);
    }

    /// Rescore against the current clock, then swap the new record into index and heap
    fn commit_update(&mut self, current: &Event, mut merged: Event) -> Mutation<Event> {
        let fresh = priority::score(merged.category, merged.weather.as_ref(), merged.scheduled_at(), self.now());
        merged.priority_score = fresh.score;
        merged.priority_label = fresh.label;
        merged.updated_at = Utc::now();

        self.heap.remove_by_id(&merged.id);
        self.admit(merged.clone());
        debug!(
            user_id = %self.user_id,
            event_id = %merged.id,
            previous_score = current.priority_score,
            score = merged.priority_score,
            completed = merged.completed,
            "Event updated"
        );

        Mutation {
            value: merged,
            persistence_warning: self.persist(),
        }
    }

    async fn enrich(&self, location: &str, at: NaiveDateTime) -> Option<WeatherSnapshot> {
        let timeout = self.options.enrichment_timeout;
        let lookup = self.weather.fetch_weather(location, at);

        let error = match tokio::time::timeout(timeout, lookup).await {
            Ok(Ok(weather)) => return Some(weather),
            Ok(Err(e)) => e,
            Err(_) => EnrichmentError::Timeout(timeout.as_millis() as u64),
        };

        warn!(
            user_id = %self.user_id,
            location,
            error = %error,
            "Weather enrichment failed; continuing without weather"
        );
        None
    }

    fn persist(&self) -> Option<PersistenceError> {
        let result = snapshot::encode(self.index.values())
            .map_err(PersistenceError::from)
            .and_then(|json| self.storage.set(&self.storage_key, &json));

        match result {
            Ok(()) => {
                debug!(user_id = %self.user_id, count = self.index.len(), "Snapshot saved");
                None
            }
            Err(e) => {
                warn!(
                    user_id = %self.user_id,
                    error = %e,
                    "Failed to save snapshot; change kept in memory only"
                );
                Some(e)
            }
        }
    }

    fn load(&mut self) {
        let raw = match self.storage.get(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(user_id = %self.user_id, "No snapshot found; starting empty");
                return;
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Failed to read snapshot; starting empty");
                return;
            }
        };

        let records = match snapshot::decode(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Malformed snapshot; starting empty");
                return;
            }
        };

        let now = self.now();
        let mut migrated = 0;
        let mut skipped = 0;
        for record in records {
            match snapshot::StoredEvent::from_value(record).and_then(|stored| stored.restore(now)) {
                Ok(restored) => {
                    if restored.migrated {
                        migrated += 1;
                    }
                    self.admit(restored.event);
                }
                Err(e) => {
                    skipped += 1;
                    warn!(user_id = %self.user_id, error = %e, "Skipping malformed event record");
                }
            }
        }

        info!(
            user_id = %self.user_id,
            loaded = self.index.len(),
            migrated,
            skipped,
            "Loaded events from snapshot"
        );
    }
}

/// Apply the caller-editable fields of `patch`, validating each one
fn merge_patch(current: &Event, patch: &EventPatch) -> SchedulerResult<Event> {
    let mut merged = current.clone();

    if let Some(title) = &patch.title {
        merged.title = required_text("title", title)?;
    }
    if let Some(date) = &patch.date {
        merged.date = parse_date(date)?;
    }
    if let Some(time) = &patch.time {
        merged.time = parse_time(time)?;
    }
    if let Some(category) = &patch.category {
        merged.category = parse_category(category)?;
    }
    if let Some(location) = &patch.location {
        merged.location = required_text("location", location)?;
    }
    if let Some(notes) = &patch.notes {
        merged.notes = notes.trim().to_string();
    }
    if let Some(completed) = patch.completed {
        merged.completed = completed;
    }

    Ok(merged)
}
