//! HTTP request handlers

pub mod auth;
pub mod events;
pub mod health;
pub mod scheduler;

pub use auth::{login, signup};
pub use health::health_check;
