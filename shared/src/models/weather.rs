//! Weather data models

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Weather attached to an event at enrichment time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(alias = "main")]
    pub condition: WeatherCondition,
    #[serde(alias = "temp", alias = "temperature")]
    pub temperature_celsius: Decimal,
    #[serde(default, alias = "humidity")]
    pub humidity_percent: i32,
    #[serde(default, alias = "windSpeed", alias = "wind_speed")]
    pub wind_speed_mps: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Coarse weather condition
///
/// Ordered by how much the condition disrupts a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[serde(alias = "Clear")]
    Clear,
    #[serde(alias = "Clouds")]
    Clouds,
    #[serde(alias = "Mist", alias = "Fog", alias = "Haze")]
    Mist,
    #[serde(alias = "Drizzle")]
    Drizzle,
    #[serde(alias = "Rain")]
    Rain,
    #[serde(alias = "Snow")]
    Snow,
    #[serde(alias = "Thunderstorm")]
    Thunderstorm,
    #[serde(alias = "Tornado", alias = "Squall")]
    Extreme,
    #[serde(other)]
    Unknown,
}

impl WeatherCondition {
    /// Map an OpenWeatherMap `weather[].main` value
    pub fn from_owm(main: &str) -> Self {
        match main.trim().to_ascii_lowercase().as_str() {
            "clear" => Self::Clear,
            "clouds" => Self::Clouds,
            "mist" | "smoke" | "haze" | "dust" | "fog" | "sand" | "ash" => Self::Mist,
            "drizzle" => Self::Drizzle,
            "rain" => Self::Rain,
            "snow" => Self::Snow,
            "thunderstorm" => Self::Thunderstorm,
            "squall" | "tornado" | "extreme" => Self::Extreme,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Clouds => "clouds",
            Self::Mist => "mist",
            Self::Drizzle => "drizzle",
            Self::Rain => "rain",
            Self::Snow => "snow",
            Self::Thunderstorm => "thunderstorm",
            Self::Extreme => "extreme",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for WeatherCondition {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_owm(s))
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owm_mapping() {
        assert_eq!(WeatherCondition::from_owm("Rain"), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm("Haze"), WeatherCondition::Mist);
        assert_eq!(WeatherCondition::from_owm("Tornado"), WeatherCondition::Extreme);
        assert_eq!(WeatherCondition::from_owm("Volcano"), WeatherCondition::Unknown);
    }

    #[test]
    fn test_legacy_weather_shape() {
        let legacy = r#"{"temp": 22, "humidity": 65, "main": "Clear", "description": "clear sky", "icon": "01d"}"#;
        let snapshot: WeatherSnapshot = serde_json::from_str(legacy).unwrap();

        assert_eq!(snapshot.condition, WeatherCondition::Clear);
        assert_eq!(snapshot.temperature_celsius, Decimal::from(22));
        assert_eq!(snapshot.humidity_percent, 65);
        assert_eq!(snapshot.wind_speed_mps, Decimal::ZERO);
    }
}
