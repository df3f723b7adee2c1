//! Event CRUD handlers
//!
//! Errors use the flat `{"error": "<message>"}` body.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, FlatResult};
use crate::services::events::{CreateEventInput, EventRow, PrioritizedEvents};
use crate::services::EventService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

impl EmailQuery {
    fn require(&self, message: &str) -> AppResult<String> {
        self.email
            .as_deref()
            .map(shared::normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::bad_request(message))
    }
}

#[derive(Serialize)]
pub struct CreatedEventResponse {
    pub message: String,
    pub event: EventRow,
}

#[derive(Serialize)]
pub struct EventListResponse {
    pub events: Vec<EventRow>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Create event endpoint handler
pub async fn create_event(
    State(state): State<AppState>,
    Json(body): Json<CreateEventInput>,
) -> FlatResult<(StatusCode, Json<CreatedEventResponse>)> {
    let input = body.validate()?;
    let event = EventService::new(state.db.clone()).create(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedEventResponse {
            message: "Event created".to_string(),
            event,
        }),
    ))
}

/// List a user's events
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> FlatResult<Json<EventListResponse>> {
    let email = query.require("Email required")?;
    let events = EventService::new(state.db.clone()).list_for_user(&email).await?;

    Ok(Json(EventListResponse { events }))
}

/// A user's events ordered by ascending weather priority
pub async fn prioritized_events(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> FlatResult<Json<PrioritizedEvents>> {
    let email = query.require("Email required")?;
    let view = EventService::new(state.db.clone())
        .prioritized_for_user(&email)
        .await?;

    Ok(Json(view))
}

/// Delete one of a user's events
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<EmailQuery>,
) -> FlatResult<Json<MessageResponse>> {
    const MISSING: &str = "Event ID and user email required";

    let email = query.require(MISSING)?;
    let id = id
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| AppError::bad_request(MISSING))?;

    EventService::new(state.db.clone()).delete(id, &email).await?;

    Ok(Json(MessageResponse {
        message: "Event deleted successfully".to_string(),
    }))
}
