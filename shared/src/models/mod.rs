//! Domain models for the Weather Scheduler

mod event;
mod weather;

pub use event::*;
pub use weather::*;
