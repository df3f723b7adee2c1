//! Shared core of the Weather Scheduler
//!
//! Priority scoring, the indexed priority heap and the per-user event store.
//! Used by the backend server and, for the pure pieces, by the WASM bindings.

pub mod clock;
pub mod enrichment;
pub mod error;
pub mod heap;
pub mod index;
pub mod models;
pub mod priority;
pub mod storage;
pub mod store;
pub mod types;
pub mod validation;

pub use error::{SchedulerError, SchedulerResult};
pub use heap::{HeapItem, HeapOrder, PriorityHeap};
pub use models::*;
pub use store::{EventStore, StoreOptions};
pub use types::*;
pub use validation::*;
