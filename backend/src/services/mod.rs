//! Business logic services

pub mod auth;
pub mod events;
pub mod scheduler;

pub use auth::AuthService;
pub use events::EventService;
pub use scheduler::SchedulerService;
