//! External service integrations

pub mod geocoding;
pub mod weather;

pub use geocoding::GeocodingClient;
pub use weather::{OpenWeatherProvider, WeatherClient};

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::enrichment::EnrichmentError;

/// HTTP client with the configured per-request timeout
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
}

/// Send a request and decode a JSON body, mapping every failure to an
/// `EnrichmentError`
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<T, EnrichmentError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            EnrichmentError::Request(format!("request timed out: {}", e))
        } else {
            EnrichmentError::Request(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(EnrichmentError::Status { status, body });
    }

    response
        .json()
        .await
        .map_err(|e| EnrichmentError::Payload(e.to_string()))
}
