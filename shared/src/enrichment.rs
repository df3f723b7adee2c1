//! Weather enrichment contract
//!
//! The store asks a `WeatherProvider` for conditions at an event's location
//! and time. Every failure is recoverable: the event is kept without weather.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::WeatherSnapshot;

/// Why a weather lookup produced no snapshot
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("weather lookup timed out after {0} ms")]
    Timeout(u64),

    #[error("location not found: {0}")]
    LocationNotFound(String),

    #[error("weather request failed: {0}")]
    Request(String),

    #[error("weather service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed weather payload: {0}")]
    Payload(String),

    #[error("weather service unavailable")]
    Unavailable,
}

/// Source of weather snapshots for a location and time
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_weather(
        &self,
        location: &str,
        at: NaiveDateTime,
    ) -> Result<WeatherSnapshot, EnrichmentError>;
}

/// Provider used when no weather service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWeather;

#[async_trait]
impl WeatherProvider for NoWeather {
    async fn fetch_weather(
        &self,
        _location: &str,
        _at: NaiveDateTime,
    ) -> Result<WeatherSnapshot, EnrichmentError> {
        Err(EnrichmentError::Unavailable)
    }
}
