//! WebAssembly module for the Weather Scheduler
//!
//! Provides client-side computation for:
//! - Event priority scoring and labels
//! - Offline event form validation
//! - Priority ordering of cached events

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::priority::{self, PriorityScore};
use shared::{HeapItem, PriorityHeap, SchedulerError, WeatherSnapshot};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("weather-scheduler wasm ready"));
}

#[derive(Debug, Deserialize)]
struct PriorityInput {
    #[serde(alias = "taskType")]
    category: String,
    date: String,
    time: String,
    #[serde(default)]
    weather: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ValidationOutcome {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

/// Accepts `YYYY-MM-DDTHH:MM[:SS]` (local) or RFC 3339
fn parse_now(now_iso: &str) -> Option<NaiveDateTime> {
    let now_iso = now_iso.trim();
    NaiveDateTime::parse_from_str(now_iso, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(now_iso, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(now_iso).ok().map(|dt| dt.naive_local()))
}

/// Browser wall-clock time
fn browser_now() -> Option<NaiveDateTime> {
    let date = js_sys::Date::new_0();
    chrono::NaiveDate::from_ymd_opt(
        date.get_full_year() as i32,
        date.get_month() + 1,
        date.get_date(),
    )?
    .and_hms_opt(date.get_hours(), date.get_minutes(), date.get_seconds())
}

fn score_event(event_json: &str, now: NaiveDateTime) -> Result<PriorityScore, String> {
    let input: PriorityInput =
        serde_json::from_str(event_json).map_err(|e| format!("Invalid event JSON: {}", e))?;

    let category = parse_category(&input.category).map_err(|e| e.to_string())?;
    let date = parse_date(&input.date).map_err(|e| e.to_string())?;
    let time = parse_time(&input.time).map_err(|e| e.to_string())?;
    let weather = input
        .weather
        .and_then(|w| serde_json::from_value::<WeatherSnapshot>(w).ok());

    Ok(priority::score(category, weather.as_ref(), date.and_time(time), now))
}

/// Score an event; returns `{"score", "label"}` as JSON
///
/// An empty `now_iso` uses the browser clock.
#[wasm_bindgen]
pub fn calculate_priority(event_json: &str, now_iso: &str) -> Result<String, JsValue> {
    let now = if now_iso.trim().is_empty() {
        browser_now()
    } else {
        parse_now(now_iso)
    }
    .ok_or_else(|| js_error(format!("Invalid timestamp: {}", now_iso)))?;

    let scored = score_event(event_json, now).map_err(js_error)?;
    serde_json::to_string(&scored).map_err(js_error)
}

/// Label for a score, e.g. `"high"`
#[wasm_bindgen]
pub fn priority_label_for(score: u8) -> String {
    priority::priority_label(score).as_str().to_string()
}

/// Validate an event form; returns `{"valid", "field"?, "message"?}` as JSON
#[wasm_bindgen]
pub fn validate_event_input(input_json: &str) -> Result<String, JsValue> {
    let input: NewEvent = serde_json::from_str(input_json)
        .map_err(|e| js_error(format!("Invalid input JSON: {}", e)))?;

    let outcome = match validate_new_event(&input) {
        Ok(_) => ValidationOutcome {
            valid: true,
            field: None,
            message: None,
        },
        Err(SchedulerError::Validation { field, message }) => ValidationOutcome {
            valid: false,
            field: Some(field),
            message: Some(message),
        },
        Err(other) => ValidationOutcome {
            valid: false,
            field: None,
            message: Some(other.to_string()),
        },
    };

    serde_json::to_string(&outcome).map_err(js_error)
}

/// Position in the input array, ranked by `priority_score`
#[derive(Debug, Clone)]
struct Ranked {
    index: usize,
    score: i64,
}

impl HeapItem for Ranked {
    type Id = usize;

    fn heap_id(&self) -> usize {
        self.index
    }

    fn heap_key(&self) -> i64 {
        self.score
    }
}

/// Sort a JSON array of events by descending `priority_score`
///
/// Events without a score rank last; ties keep their input order.
#[wasm_bindgen]
pub fn order_by_priority(events_json: &str) -> Result<String, JsValue> {
    let events: Vec<Value> = serde_json::from_str(events_json)
        .map_err(|e| js_error(format!("Invalid events JSON: {}", e)))?;

    let mut heap = PriorityHeap::max();
    heap.extend(events.iter().enumerate().map(|(index, event)| Ranked {
        index,
        score: event
            .get("priority_score")
            .or_else(|| event.get("priorityScore"))
            .and_then(Value::as_i64)
            .unwrap_or(-1),
    }));

    let ordered: Vec<&Value> = heap
        .into_sorted_vec()
        .into_iter()
        .map(|ranked| &events[ranked.index])
        .collect();

    serde_json::to_string(&ordered).map_err(js_error)
}
