//! Scheduler handlers
//!
//! HTTP surface over the per-user `EventStore`. The user is identified by
//! the `email` query parameter.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::{Event, EventId, EventPatch, EventStats, Mutation, NewEvent};

use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SchedulerQuery {
    pub email: Option<String>,
    #[serde(default)]
    pub include_completed: bool,
}

impl SchedulerQuery {
    fn email(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
}

#[derive(Serialize)]
pub struct EventResponse {
    pub event: Option<Event>,
}

#[derive(Serialize)]
pub struct DateEventsResponse {
    pub date: String,
    pub events: Vec<Event>,
}

/// `{<key>: value, durable, warning}`
fn mutation_body<T: Serialize>(key: &str, mutation: Mutation<T>) -> Value {
    let durable = mutation.is_durable();
    let warning = mutation.persistence_warning.map(|e| e.to_string());
    let mut body = json!({ "durable": durable, "warning": warning });
    body[key] = json!(mutation.value);
    body
}

/// List events in schedule order
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<SchedulerQuery>,
) -> AppResult<Json<EventsResponse>> {
    let store = state.scheduler.store_for(query.email()).await?;
    let store = store.lock().await;

    Ok(Json(EventsResponse {
        events: store.get_all(query.include_completed),
    }))
}

/// Create an event; weather lookup happens before the response
pub async fn create_event(
    State(state): State<AppState>,
    Query(query): Query<SchedulerQuery>,
    Json(body): Json<NewEvent>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let store = state.scheduler.store_for(query.email()).await?;
    let mutation = store.lock().await.add_event(body).await?;

    Ok((StatusCode::CREATED, Json(mutation_body("event", mutation))))
}

/// Events from highest to lowest priority
pub async fn prioritized_events(
    State(state): State<AppState>,
    Query(query): Query<SchedulerQuery>,
) -> AppResult<Json<EventsResponse>> {
    let store = state.scheduler.store_for(query.email()).await?;
    let store = store.lock().await;

    Ok(Json(EventsResponse {
        events: store.get_by_priority_order(query.include_completed),
    }))
}

pub async fn next_event(
    State(state): State<AppState>,
    Query(query): Query<SchedulerQuery>,
) -> AppResult<Json<EventResponse>> {
    let store = state.scheduler.store_for(query.email()).await?;
    let store = store.lock().await;

    Ok(Json(EventResponse {
        event: store.next_priority_event(),
    }))
}

pub async fn events_on_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(query): Query<SchedulerQuery>,
) -> AppResult<Json<DateEventsResponse>> {
    let date = shared::parse_date(&date)?;
    let store = state.scheduler.store_for(query.email()).await?;
    let store = store.lock().await;

    Ok(Json(DateEventsResponse {
        date: date.format("%Y-%m-%d").to_string(),
        events: store.get_by_date(date),
    }))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SchedulerQuery>,
) -> AppResult<Json<EventResponse>> {
    let store = state.scheduler.store_for(query.email()).await?;
    let store = store.lock().await;
    let id = EventId::from(id);

    let event = store
        .get_by_id(&id)
        .cloned()
        .ok_or_else(|| AppError::from(shared::SchedulerError::NotFound(id)))?;

    Ok(Json(EventResponse { event: Some(event) }))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SchedulerQuery>,
    Json(patch): Json<EventPatch>,
) -> AppResult<Json<Value>> {
    let store = state.scheduler.store_for(query.email()).await?;
    let mutation = store
        .lock()
        .await
        .update_event(&EventId::from(id), patch)
        .await?;

    Ok(Json(mutation_body("event", mutation)))
}

pub async fn complete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SchedulerQuery>,
) -> AppResult<Json<Value>> {
    let store = state.scheduler.store_for(query.email()).await?;
    let mutation = store.lock().await.mark_completed(&EventId::from(id))?;

    Ok(Json(mutation_body("event", mutation)))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SchedulerQuery>,
) -> AppResult<Json<Value>> {
    let store = state.scheduler.store_for(query.email()).await?;
    let mutation = store.lock().await.delete_event(&EventId::from(id))?;

    let mut body = mutation_body("deleted", mutation.map(|()| true));
    body["message"] = json!("Event deleted successfully");
    Ok(Json(body))
}

/// Recompute every score against the current time
pub async fn refresh_priorities(
    State(state): State<AppState>,
    Query(query): Query<SchedulerQuery>,
) -> AppResult<Json<Value>> {
    let store = state.scheduler.store_for(query.email()).await?;
    let mutation = store.lock().await.refresh_priorities();

    Ok(Json(mutation_body("updated", mutation)))
}

pub async fn clear_events(
    State(state): State<AppState>,
    Query(query): Query<SchedulerQuery>,
) -> AppResult<Json<Value>> {
    let store = state.scheduler.store_for(query.email()).await?;
    let mutation = store.lock().await.clear_all();

    let mut body = mutation_body("cleared", mutation.map(|()| true));
    body["message"] = json!("All events cleared");
    Ok(Json(body))
}

pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<SchedulerQuery>,
) -> AppResult<Json<EventStats>> {
    let store = state.scheduler.store_for(query.email()).await?;
    let store = store.lock().await;

    Ok(Json(store.get_stats()))
}
