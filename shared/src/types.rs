//! Common types used across the platform

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque event identifier
///
/// Fresh identifiers are UUID v4 strings. Identifiers read from older
/// snapshots (millisecond timestamps, for instance) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generate a new random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// GPS coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl Coordinates {
    pub fn new(latitude: Decimal, longitude: Decimal) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Result of a mutating store operation
///
/// The in-memory change has always been applied when a `Mutation` is
/// returned. `persistence_warning` is set when the snapshot could not be
/// written, in which case the change is not durable.
#[derive(Debug)]
pub struct Mutation<T> {
    pub value: T,
    pub persistence_warning: Option<crate::storage::PersistenceError>,
}

impl<T> Mutation<T> {
    pub fn is_durable(&self) -> bool {
        self.persistence_warning.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Mutation<U> {
        Mutation {
            value: f(self.value),
            persistence_warning: self.persistence_warning,
        }
    }
}
