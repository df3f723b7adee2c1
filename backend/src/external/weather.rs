//! Weather API client for fetching weather data
//!
//! Integrates with OpenWeatherMap API for current conditions and the
//! 5-day / 3-hour forecast, and adapts both to `WeatherSnapshot`s for the
//! event store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::enrichment::{EnrichmentError, WeatherProvider};
use shared::models::{WeatherCondition, WeatherSnapshot};

use super::{fetch_json, http_client, GeocodingClient};
use crate::config::WeatherConfig;

/// Forecast entries are 3 hours apart; a lookup within half a step of the
/// last entry still counts as covered
const FORECAST_STEP_SLACK_MINUTES: i64 = 90;

/// Weather API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Current weather conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub timestamp: DateTime<Utc>,
    pub temperature_celsius: Decimal,
    pub humidity_percent: i32,
    pub wind_speed_mps: Decimal,
    pub weather_condition: String,
    pub weather_description: String,
}

/// Weather forecast for a specific time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastItem {
    pub timestamp: DateTime<Utc>,
    pub temperature_celsius: Decimal,
    pub humidity_percent: i32,
    pub wind_speed_mps: Decimal,
    pub weather_condition: String,
    pub weather_description: String,
    pub pop: Decimal, // Probability of precipitation (0-1)
}

/// OpenWeatherMap API response for current weather
#[derive(Debug, Deserialize)]
struct OWMCurrentResponse {
    weather: Vec<OWMWeather>,
    main: OWMMain,
    wind: OWMWind,
    dt: i64,
}

#[derive(Debug, Deserialize)]
struct OWMWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OWMMain {
    temp: f64,
    humidity: i32,
}

#[derive(Debug, Deserialize)]
struct OWMWind {
    speed: f64,
}

/// OpenWeatherMap API response for forecast
#[derive(Debug, Deserialize)]
struct OWMForecastResponse {
    list: Vec<OWMForecastItem>,
}

#[derive(Debug, Deserialize)]
struct OWMForecastItem {
    dt: i64,
    main: OWMMain,
    weather: Vec<OWMWeather>,
    wind: OWMWind,
    #[serde(default)]
    pop: f64,
}

fn decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp(2))
        .unwrap_or_default()
}

impl WeatherClient {
    /// Create a new WeatherClient
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            api_key,
            base_url,
        }
    }

    /// Fetch current weather conditions by GPS coordinates
    pub async fn get_current_weather(
        &self,
        latitude: Decimal,
        longitude: Decimal,
    ) -> Result<CurrentWeather, EnrichmentError> {
        let url = format!(
            "{}/weather?lat={}&lon={}&appid={}&units=metric",
            self.base_url, latitude, longitude, self.api_key
        );

        let data: OWMCurrentResponse = fetch_json(self.client.get(&url)).await?;
        let weather = data.weather.first();

        Ok(CurrentWeather {
            timestamp: DateTime::from_timestamp(data.dt, 0).unwrap_or_else(Utc::now),
            temperature_celsius: decimal(data.main.temp),
            humidity_percent: data.main.humidity,
            wind_speed_mps: decimal(data.wind.speed),
            weather_condition: weather.map(|w| w.main.clone()).unwrap_or_default(),
            weather_description: weather.map(|w| w.description.clone()).unwrap_or_default(),
        })
    }

    /// Fetch the 5-day / 3-hour forecast by GPS coordinates
    pub async fn get_forecast(
        &self,
        latitude: Decimal,
        longitude: Decimal,
    ) -> Result<Vec<ForecastItem>, EnrichmentError> {
        let url = format!(
            "{}/forecast?lat={}&lon={}&appid={}&units=metric",
            self.base_url, latitude, longitude, self.api_key
        );

        let data: OWMForecastResponse = fetch_json(self.client.get(&url)).await?;

        Ok(data
            .list
            .into_iter()
            .map(|item| {
                let weather = item.weather.first();
                ForecastItem {
                    timestamp: DateTime::from_timestamp(item.dt, 0).unwrap_or_else(Utc::now),
                    temperature_celsius: decimal(item.main.temp),
                    humidity_percent: item.main.humidity,
                    wind_speed_mps: decimal(item.wind.speed),
                    weather_condition: weather.map(|w| w.main.clone()).unwrap_or_default(),
                    weather_description: weather.map(|w| w.description.clone()).unwrap_or_default(),
                    pop: decimal(item.pop),
                }
            })
            .collect())
    }
}

impl From<CurrentWeather> for WeatherSnapshot {
    fn from(current: CurrentWeather) -> Self {
        WeatherSnapshot {
            condition: WeatherCondition::from_owm(&current.weather_condition),
            temperature_celsius: current.temperature_celsius,
            humidity_percent: current.humidity_percent,
            wind_speed_mps: current.wind_speed_mps,
            description: Some(current.weather_description).filter(|d| !d.is_empty()),
        }
    }
}

impl From<&ForecastItem> for WeatherSnapshot {
    fn from(item: &ForecastItem) -> Self {
        WeatherSnapshot {
            condition: WeatherCondition::from_owm(&item.weather_condition),
            temperature_celsius: item.temperature_celsius,
            humidity_percent: item.humidity_percent,
            wind_speed_mps: item.wind_speed_mps,
            description: Some(item.weather_description.clone()).filter(|d| !d.is_empty()),
        }
    }
}

/// Forecast entry closest to `at`, if `at` falls inside the forecast window
pub fn nearest_forecast(forecasts: &[ForecastItem], at: DateTime<Utc>) -> Option<&ForecastItem> {
    let slack = chrono::Duration::minutes(FORECAST_STEP_SLACK_MINUTES);
    let first = forecasts.iter().map(|f| f.timestamp).min()?;
    let last = forecasts.iter().map(|f| f.timestamp).max()?;
    if at < first - slack || at > last + slack {
        return None;
    }

    forecasts
        .iter()
        .min_by_key(|f| (f.timestamp - at).num_seconds().abs())
}

/// Event times are local wall-clock times
fn to_utc(at: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&at)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&at))
}

/// `WeatherProvider` backed by OpenWeatherMap
///
/// Geocodes the location, then uses the forecast entry nearest the event
/// time when the event is within the forecast horizon, otherwise current
/// conditions.
#[derive(Clone)]
pub struct OpenWeatherProvider {
    geocoder: GeocodingClient,
    weather: WeatherClient,
}

impl OpenWeatherProvider {
    pub fn new(geocoder: GeocodingClient, weather: WeatherClient) -> Self {
        Self { geocoder, weather }
    }

    pub fn from_config(config: &WeatherConfig) -> Self {
        Self::new(
            GeocodingClient::new(
                config.api_key.clone(),
                config.geocoding_endpoint.clone(),
                config.timeout(),
            ),
            WeatherClient::new(config.api_key.clone(), config.api_endpoint.clone(), config.timeout()),
        )
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_weather(
        &self,
        location: &str,
        at: NaiveDateTime,
    ) -> Result<WeatherSnapshot, EnrichmentError> {
        let coords = self.geocoder.resolve(location).await?;

        let forecasts = self
            .weather
            .get_forecast(coords.latitude, coords.longitude)
            .await?;
        if let Some(item) = nearest_forecast(&forecasts, to_utc(at)) {
            tracing::debug!(location, forecast_at = %item.timestamp, "Using forecast weather");
            return Ok(WeatherSnapshot::from(item));
        }

        tracing::debug!(location, "Event outside forecast window; using current weather");
        let current = self
            .weather
            .get_current_weather(coords.latitude, coords.longitude)
            .await?;
        Ok(WeatherSnapshot::from(current))
    }
}
