//! Location name to coordinates, via the OpenWeatherMap geocoding API

use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::enrichment::EnrichmentError;
use shared::types::Coordinates;

use super::{fetch_json, http_client};

/// Geocoding API client
#[derive(Clone)]
pub struct GeocodingClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OWMGeoResult {
    lat: f64,
    lon: f64,
}

impl GeocodingClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_key,
            base_url,
        }
    }

    /// Resolve a free-text location to the first matching coordinates
    pub async fn resolve(&self, location: &str) -> Result<Coordinates, EnrichmentError> {
        let request = self
            .client
            .get(format!("{}/direct", self.base_url))
            .query(&[("q", location), ("limit", "1"), ("appid", self.api_key.as_str())]);

        let results: Vec<OWMGeoResult> = fetch_json(request).await?;
        let first = results
            .into_iter()
            .next()
            .ok_or_else(|| EnrichmentError::LocationNotFound(location.to_string()))?;

        Ok(Coordinates::new(
            Decimal::from_f64_retain(first.lat).unwrap_or_default(),
            Decimal::from_f64_retain(first.lon).unwrap_or_default(),
        ))
    }
}
