use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::*;
use crate::clock::{Clock, FixedClock};
use crate::enrichment::NoWeather;
use crate::models::{EventCategory, PriorityLabel, WeatherCondition};
use crate::storage::MemoryStore;

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn options() -> StoreOptions {
    StoreOptions {
        enrichment_timeout: Duration::from_millis(50),
        clock: Arc::new(FixedClock(now())),
    }
}

/// Clock a test can move forward
struct SteppingClock(std::sync::Mutex<NaiveDateTime>);

impl SteppingClock {
    fn starting_at(at: NaiveDateTime) -> Self {
        Self(std::sync::Mutex::new(at))
    }

    fn advance(&self, by: chrono::Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

fn rain() -> WeatherSnapshot {
    WeatherSnapshot {
        condition: WeatherCondition::Rain,
        temperature_celsius: Decimal::from_str("20.5").unwrap(),
        humidity_percent: 80,
        wind_speed_mps: Decimal::from(3),
        description: Some("light rain".to_string()),
    }
}

struct FixedWeather(WeatherSnapshot);

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn fetch_weather(
        &self,
        _location: &str,
        _at: NaiveDateTime,
    ) -> Result<WeatherSnapshot, EnrichmentError> {
        Ok(self.0.clone())
    }
}

struct FailingWeather;

#[async_trait]
impl WeatherProvider for FailingWeather {
    async fn fetch_weather(
        &self,
        location: &str,
        _at: NaiveDateTime,
    ) -> Result<WeatherSnapshot, EnrichmentError> {
        Err(EnrichmentError::LocationNotFound(location.to_string()))
    }
}

struct SlowWeather;

#[async_trait]
impl WeatherProvider for SlowWeather {
    async fn fetch_weather(
        &self,
        _location: &str,
        _at: NaiveDateTime,
    ) -> Result<WeatherSnapshot, EnrichmentError> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(rain())
    }
}

#[derive(Default)]
struct CountingWeather {
    calls: AtomicUsize,
}

#[async_trait]
impl WeatherProvider for CountingWeather {
    async fn fetch_weather(
        &self,
        _location: &str,
        _at: NaiveDateTime,
    ) -> Result<WeatherSnapshot, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(rain())
    }
}

/// Storage whose writes always fail
struct ReadOnlyStorage;

impl KeyValueStore for ReadOnlyStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
        Err(PersistenceError::Backend("disk full".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), PersistenceError> {
        Err(PersistenceError::Backend("disk full".to_string()))
    }
}

fn store_with(weather: Arc<dyn WeatherProvider>) -> (EventStore, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let store = EventStore::open("farmer@example.com", storage.clone(), weather, options());
    (store, storage)
}

fn new_event(title: &str, category: &str, date: &str, time: &str) -> NewEvent {
    NewEvent {
        title: title.to_string(),
        date: date.to_string(),
        time: time.to_string(),
        category: category.to_string(),
        location: "Chiang Mai".to_string(),
        notes: None,
    }
}

// ----------------------------------------------------------------------------
// Adding and scoring
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_urgent_emergency_is_critical() {
    let (mut store, _) = store_with(Arc::new(NoWeather));

    let event = store
        .add_event(new_event("Flooded cellar", "emergency", "2024-06-01", "11:00"))
        .await
        .unwrap()
        .into_value();

    assert_eq!(event.priority_score, 85);
    assert_eq!(event.priority_label, PriorityLabel::Critical);
    assert!(event.weather.is_none());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_distant_indoor_work_is_low_priority() {
    let weather = WeatherSnapshot {
        condition: WeatherCondition::Clear,
        ..rain()
    };
    let (mut store, _) = store_with(Arc::new(FixedWeather(weather)));

    let event = store
        .add_event(new_event("File reports", "Indoor Work", "2024-06-11", "09:00"))
        .await
        .unwrap()
        .into_value();

    assert_eq!(event.priority_score, 10);
    assert_eq!(event.priority_label, PriorityLabel::VeryLow);
}

#[tokio::test]
async fn test_weather_failure_does_not_fail_add() {
    let (mut store, _) = store_with(Arc::new(FailingWeather));

    let mutation = store
        .add_event(new_event("Pick cherries", "outdoor_work", "2024-06-01", "11:00"))
        .await
        .unwrap();

    assert!(mutation.is_durable());
    let event = mutation.into_value();
    assert!(event.weather.is_none());
    // outdoor work (35) + within 24h (25)
    assert_eq!(event.priority_score, 60);
    assert_eq!(event.priority_label, PriorityLabel::High);
}

#[tokio::test]
async fn test_weather_timeout_does_not_fail_add() {
    let (mut store, _) = store_with(Arc::new(SlowWeather));

    let event = store
        .add_event(new_event("Pick cherries", "outdoor_work", "2024-06-05", "08:00"))
        .await
        .unwrap()
        .into_value();

    assert!(event.weather.is_none());
    assert_eq!(event.priority_score, 35);
}

#[tokio::test]
async fn test_weather_is_attached_and_scored() {
    let (mut store, _) = store_with(Arc::new(FixedWeather(rain())));

    let event = store
        .add_event(new_event("Pick cherries", "outdoor_work", "2024-06-05", "08:00"))
        .await
        .unwrap()
        .into_value();

    assert_eq!(event.weather, Some(rain()));
    // outdoor work (35) + rain (10)
    assert_eq!(event.priority_score, 45);
    assert_eq!(event.priority_label, PriorityLabel::Medium);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_without_side_effects() {
    let (mut store, storage) = store_with(Arc::new(NoWeather));

    let err = store
        .add_event(new_event("", "meeting", "2024-06-02", "10:00"))
        .await
        .unwrap_err();

    assert!(matches!(err, SchedulerError::Validation { ref field, .. } if field == "title"));
    assert!(store.is_empty());
    assert!(storage.get(&EventStore::storage_key("farmer@example.com")).unwrap().is_none());
}

// ----------------------------------------------------------------------------
// Updating, completing, deleting
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_delete_unknown_id_is_not_found() {
    let (mut store, _) = store_with(Arc::new(NoWeather));
    store
        .add_event(new_event("Team sync", "meeting", "2024-06-02", "10:00"))
        .await
        .unwrap();
    let before = store.get_all(true);

    let err = store.delete_event(&EventId::from("missing")).unwrap_err();

    assert_eq!(err, SchedulerError::NotFound(EventId::from("missing")));
    assert_eq!(store.get_all(true), before);
}

#[tokio::test]
async fn test_delete_removes_from_every_view() {
    let (mut store, _) = store_with(Arc::new(NoWeather));
    let event = store
        .add_event(new_event("Team sync", "meeting", "2024-06-02", "10:00"))
        .await
        .unwrap()
        .into_value();

    store.delete_event(&event.id).unwrap();

    assert!(store.get_by_id(&event.id).is_none());
    assert!(store.get_by_priority_order(true).is_empty());
    assert!(store.next_priority_event().is_none());
}

#[tokio::test]
async fn test_update_reenriches_only_on_move() {
    let weather = Arc::new(CountingWeather::default());
    let (mut store, _) = store_with(weather.clone());
    let event = store
        .add_event(new_event("Harvest", "outdoor_work", "2024-06-05", "08:00"))
        .await
        .unwrap()
        .into_value();
    assert_eq!(weather.calls.load(Ordering::SeqCst), 1);

    let renamed = store
        .update_event(
            &event.id,
            EventPatch {
                title: Some("Harvest plot 3".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .into_value();
    assert_eq!(weather.calls.load(Ordering::SeqCst), 1);
    assert_eq!(renamed.title, "Harvest plot 3");
    assert_eq!(renamed.priority_score, event.priority_score);

    let moved = store
        .update_event(
            &event.id,
            EventPatch {
                date: Some("2024-06-01".to_string()),
                time: Some("15:00".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .into_value();
    assert_eq!(weather.calls.load(Ordering::SeqCst), 2);
    // outdoor work (35) + rain (10) + within 24h (25)
    assert_eq!(moved.priority_score, 70);
    assert_eq!(store.peek_top().map(|e| e.id.clone()), Some(event.id.clone()));
}

#[tokio::test]
async fn test_update_rescores_against_current_clock() {
    let clock = Arc::new(SteppingClock::starting_at(now()));
    let options = StoreOptions {
        clock: clock.clone(),
        ..options()
    };
    let mut store = EventStore::open("u", Arc::new(MemoryStore::new()), Arc::new(NoWeather), options);
    let event = store
        .add_event(new_event("Team sync", "meeting", "2024-06-05", "10:00"))
        .await
        .unwrap()
        .into_value();
    assert_eq!(event.priority_score, 25);

    // Four days on, the meeting is an hour away
    clock.advance(chrono::Duration::days(4));
    let renamed = store
        .update_event(
            &event.id,
            EventPatch {
                title: Some("Team sync (moved room)".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .into_value();

    assert_eq!(renamed.priority_score, 50);
    assert_eq!(renamed.priority_label, PriorityLabel::Medium);
    assert_eq!(store.heap_entries(), vec![(event.id.clone(), 50)]);

    let first = store.mark_completed(&event.id).unwrap().into_value();
    let second = store.mark_completed(&event.id).unwrap().into_value();
    assert_eq!(first.priority_score, 50);
    assert_eq!(second.priority_score, first.priority_score);
    assert_eq!(second.priority_label, first.priority_label);
}

#[tokio::test]
async fn test_update_category_rescores() {
    let (mut store, _) = store_with(Arc::new(NoWeather));
    let event = store
        .add_event(new_event("Check-up", "study", "2024-06-10", "10:00"))
        .await
        .unwrap()
        .into_value();
    assert_eq!(event.priority_score, 10);

    let updated = store
        .update_event(
            &event.id,
            EventPatch {
                category: Some("Medical".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .into_value();

    assert_eq!(updated.category, EventCategory::Medical);
    assert_eq!(updated.priority_score, 55);
    assert_eq!(updated.priority_label, PriorityLabel::High);
}

#[tokio::test]
async fn test_update_rejects_invalid_patch() {
    let (mut store, _) = store_with(Arc::new(NoWeather));
    let event = store
        .add_event(new_event("Team sync", "meeting", "2024-06-02", "10:00"))
        .await
        .unwrap()
        .into_value();

    let err = store
        .update_event(
            &event.id,
            EventPatch {
                time: Some("noon".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SchedulerError::Validation { ref field, .. } if field == "time"));
    assert_eq!(store.get_by_id(&event.id), Some(&event));
}

#[tokio::test]
async fn test_mark_completed_is_idempotent() {
    let (mut store, _) = store_with(Arc::new(NoWeather));
    let event = store
        .add_event(new_event("Team sync", "meeting", "2024-06-02", "10:00"))
        .await
        .unwrap()
        .into_value();

    let first = store.mark_completed(&event.id).unwrap().into_value();
    let second = store.mark_completed(&event.id).unwrap().into_value();

    assert!(first.completed && second.completed);
    assert_eq!(second.priority_score, event.priority_score);
    assert_eq!(store.get_stats().completed, 1);
    assert!(store.get_all(false).is_empty());
    assert_eq!(store.get_all(true).len(), 1);
}

// ----------------------------------------------------------------------------
// Queries
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_priority_order_and_next_event() {
    let (mut store, _) = store_with(Arc::new(NoWeather));
    let low = store
        .add_event(new_event("Groceries", "shopping", "2024-06-09", "10:00"))
        .await
        .unwrap()
        .into_value();
    let high = store
        .add_event(new_event("Burst pipe", "emergency", "2024-06-01", "12:00"))
        .await
        .unwrap()
        .into_value();
    let mid = store
        .add_event(new_event("Site visit", "construction", "2024-06-08", "10:00"))
        .await
        .unwrap()
        .into_value();

    let ids: Vec<EventId> = store
        .get_by_priority_order(false)
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![high.id.clone(), mid.id.clone(), low.id.clone()]);

    store.mark_completed(&high.id).unwrap();

    // Completed events stay at the root but are skipped
    assert_eq!(store.peek_top().map(|e| e.id.clone()), Some(high.id.clone()));
    assert_eq!(store.next_priority_event().map(|e| e.id), Some(mid.id.clone()));
    assert_eq!(store.get_by_priority_order(true).len(), 3);
    assert_eq!(store.get_by_priority_order(false).len(), 2);
}

#[tokio::test]
async fn test_get_all_sorted_by_schedule() {
    let (mut store, _) = store_with(Arc::new(NoWeather));
    for (title, date, time) in [
        ("third", "2024-06-03", "08:00"),
        ("first", "2024-06-02", "08:00"),
        ("second", "2024-06-02", "17:30"),
    ] {
        store
            .add_event(new_event(title, "meeting", date, time))
            .await
            .unwrap();
    }

    let titles: Vec<String> = store.get_all(true).into_iter().map(|e| e.title).collect();
    assert_eq!(titles, vec!["first", "second", "third"]);

    let day: Vec<String> = store
        .get_by_date(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap())
        .into_iter()
        .map(|e| e.title)
        .collect();
    assert_eq!(day, vec!["first", "second"]);
}

#[tokio::test]
async fn test_stats() {
    let (mut store, _) = store_with(Arc::new(NoWeather));
    let urgent = store
        .add_event(new_event("Burst pipe", "emergency", "2024-06-01", "12:00"))
        .await
        .unwrap()
        .into_value();
    store
        .add_event(new_event("Groceries", "shopping", "2024-06-09", "10:00"))
        .await
        .unwrap();
    store.mark_completed(&urgent.id).unwrap();

    let stats = store.get_stats();
    assert_eq!(
        stats,
        EventStats {
            total: 2,
            completed: 1,
            pending: 1,
            high_priority: 1,
            today: 1,
        }
    );
}

#[tokio::test]
async fn test_refresh_priorities_follows_clock() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut store = EventStore::open("u", storage.clone(), Arc::new(NoWeather), options());
    let event = store
        .add_event(new_event("Team sync", "meeting", "2024-06-05", "10:00"))
        .await
        .unwrap()
        .into_value();
    assert_eq!(event.priority_score, 25);

    // Four days on, the meeting is an hour away
    let later = StoreOptions {
        clock: Arc::new(FixedClock(now() + chrono::Duration::days(4))),
        ..options()
    };
    let mut reopened = EventStore::open("u", storage, Arc::new(NoWeather), later);
    let changed = reopened.refresh_priorities().into_value();

    assert_eq!(changed, 1);
    assert_eq!(reopened.get_by_id(&event.id).map(|e| e.priority_score), Some(50));
}

#[tokio::test]
async fn test_clear_all() {
    let (mut store, storage) = store_with(Arc::new(NoWeather));
    store
        .add_event(new_event("Team sync", "meeting", "2024-06-02", "10:00"))
        .await
        .unwrap();

    assert!(store.clear_all().is_durable());
    assert!(store.is_empty());

    let reopened = EventStore::open("farmer@example.com", storage, Arc::new(NoWeather), options());
    assert!(reopened.is_empty());
}

// ----------------------------------------------------------------------------
// Persistence
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_snapshot_round_trip() {
    let (mut store, storage) = store_with(Arc::new(FixedWeather(rain())));
    let event = store
        .add_event(new_event("Harvest", "outdoor_work", "2024-06-05", "08:00"))
        .await
        .unwrap()
        .into_value();
    store
        .add_event(new_event("Team sync", "meeting", "2024-06-02", "10:00"))
        .await
        .unwrap();

    let reopened = EventStore::open("farmer@example.com", storage, Arc::new(NoWeather), options());

    assert_eq!(reopened.get_all(true), store.get_all(true));
    assert_eq!(reopened.get_by_id(&event.id), Some(&event));
}

#[tokio::test]
async fn test_stores_are_isolated_per_user() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut alice = EventStore::open("alice", storage.clone(), Arc::new(NoWeather), options());
    alice
        .add_event(new_event("Team sync", "meeting", "2024-06-02", "10:00"))
        .await
        .unwrap();

    let bob = EventStore::open("bob", storage, Arc::new(NoWeather), options());
    assert!(bob.is_empty());
}

#[test]
fn test_legacy_snapshot_is_migrated() {
    let storage = Arc::new(MemoryStore::new());
    let legacy = r#"[
        {
            "id": 1717232400000,
            "title": "Team sync",
            "date": "2024-06-02",
            "time": "10:00",
            "taskType": "Meeting",
            "location": "Office",
            "description": "weekly",
            "weather": {},
            "createdAt": "2024-05-30T08:00:00Z"
        },
        {
            "title": "Sow seedlings",
            "date": "2024-06-01",
            "time": "13:00",
            "taskType": "Garden Maintenance",
            "location": "Greenhouse",
            "weather": {"main": "Rain", "temp": 18, "humidity": 90}
        },
        {"title": "broken record"}
    ]"#;
    storage.set("events_legacy", legacy).unwrap();

    let store = EventStore::open("legacy", storage, Arc::new(NoWeather), options());

    assert_eq!(store.len(), 2);
    let meeting = store.get_by_id(&EventId::from("1717232400000")).unwrap();
    assert_eq!(meeting.notes, "weekly");
    assert!(meeting.weather.is_none());
    // meeting (25) + within 72h (10)
    assert_eq!(meeting.priority_score, 35);
    assert_eq!(meeting.priority_label, PriorityLabel::Medium);

    let garden = store.next_priority_event().unwrap();
    assert_eq!(garden.title, "Sow seedlings");
    assert_eq!(garden.weather.as_ref().map(|w| w.condition), Some(WeatherCondition::Rain));
    // garden (30) + rain (10) + within 24h (25)
    assert_eq!(garden.priority_score, 65);
}

#[test]
fn test_malformed_snapshot_starts_empty() {
    let storage = Arc::new(MemoryStore::new());
    storage.set("events_broken", "{not json").unwrap();

    let store = EventStore::open("broken", storage, Arc::new(NoWeather), options());

    assert!(store.is_empty());
}

#[tokio::test]
async fn test_persistence_failure_keeps_change_in_memory() {
    let mut store = EventStore::open("u", Arc::new(ReadOnlyStorage), Arc::new(NoWeather), options());

    let mutation = store
        .add_event(new_event("Team sync", "meeting", "2024-06-02", "10:00"))
        .await
        .unwrap();

    assert!(!mutation.is_durable());
    assert!(matches!(mutation.persistence_warning, Some(PersistenceError::Backend(_))));
    assert_eq!(store.len(), 1);
}

// ----------------------------------------------------------------------------
// Index and heap stay in lockstep
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Add(usize, u32),
    Update(usize, usize, u32),
    Complete(usize),
    Delete(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..13, 0u32..240).prop_map(|(c, h)| Op::Add(c, h)),
        (0usize..16, 0usize..13, 0u32..240).prop_map(|(i, c, h)| Op::Update(i, c, h)),
        (0usize..16).prop_map(Op::Complete),
        (0usize..16).prop_map(Op::Delete),
    ]
}

/// Date and time strings `hours` after the fixture clock
fn schedule(hours: u32) -> (String, String) {
    let at = now() + chrono::Duration::hours(i64::from(hours));
    (at.date().format("%Y-%m-%d").to_string(), at.time().format("%H:%M").to_string())
}

fn assert_heap_matches_index(store: &EventStore) {
    let mut from_heap = store.heap_entries();
    let mut from_index: Vec<(EventId, u8)> = store
        .get_all(true)
        .into_iter()
        .map(|e| (e.id, e.priority_score))
        .collect();
    from_heap.sort();
    from_index.sort();

    assert_eq!(from_heap.len(), store.len());
    assert_eq!(from_heap, from_index);
}

proptest! {
    #[test]
    fn prop_index_and_heap_hold_same_ids(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async {
            let (mut store, _) = store_with(Arc::new(NoWeather));
            let mut ids: Vec<EventId> = Vec::new();

            for op in ops {
                match op {
                    Op::Add(category, hours) => {
                        let (date, time) = schedule(hours);
                        let input = NewEvent {
                            title: "generated".to_string(),
                            date,
                            time,
                            category: EventCategory::ALL[category].as_str().to_string(),
                            location: "Somewhere".to_string(),
                            notes: None,
                        };
                        let event = store.add_event(input).await.unwrap().into_value();
                        ids.push(event.id);
                    }
                    Op::Update(i, category, hours) => {
                        if let Some(id) = ids.get(i) {
                            let (date, time) = schedule(hours);
                            let patch = EventPatch {
                                date: Some(date),
                                time: Some(time),
                                category: Some(EventCategory::ALL[category].as_str().to_string()),
                                ..Default::default()
                            };
                            store.update_event(id, patch).await.unwrap();
                        }
                    }
                    Op::Complete(i) => {
                        if let Some(id) = ids.get(i) {
                            store.mark_completed(id).unwrap();
                        }
                    }
                    Op::Delete(i) => {
                        if i < ids.len() {
                            let id = ids.remove(i);
                            store.delete_event(&id).unwrap();
                        }
                    }
                }
                assert_heap_matches_index(&store);
            }

            let mut from_index: Vec<EventId> =
                store.get_all(true).into_iter().map(|e| e.id).collect();
            from_index.sort();
            ids.sort();
            assert_eq!(from_index, ids);

            let scores: Vec<u8> = store
                .get_by_priority_order(true)
                .into_iter()
                .map(|e| e.priority_score)
                .collect();
            assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        });
    }
}
