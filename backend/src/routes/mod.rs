//! Route definitions for the Weather Scheduler server

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Account routes
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        // Database-backed event CRUD
        .nest("/events", event_routes())
        // Per-user weather-aware scheduler
        .nest("/scheduler", scheduler_routes())
}

/// Event CRUD routes
fn event_routes() -> Router<AppState> {
    use handlers::events;

    Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route("/prioritized", get(events::prioritized_events))
        .route("/:id", axum::routing::delete(events::delete_event))
}

/// Scheduler routes
fn scheduler_routes() -> Router<AppState> {
    use handlers::scheduler;

    Router::new()
        .route(
            "/events",
            get(scheduler::list_events)
                .post(scheduler::create_event)
                .delete(scheduler::clear_events),
        )
        .route("/events/prioritized", get(scheduler::prioritized_events))
        .route("/events/next", get(scheduler::next_event))
        .route("/events/date/:date", get(scheduler::events_on_date))
        .route(
            "/events/:id",
            get(scheduler::get_event)
                .patch(scheduler::update_event)
                .delete(scheduler::delete_event),
        )
        .route("/events/:id/complete", post(scheduler::complete_event))
        .route("/refresh", post(scheduler::refresh_priorities))
        .route("/stats", get(scheduler::stats))
}
