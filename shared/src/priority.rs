//! Event priority scoring
//!
//! Scores are integers in `0..=100`; higher means more urgent. A score is
//! the sum of three additive terms, clamped:
//! - a base weight for the event category
//! - a weather term (condition, extreme temperature, high wind)
//! - a time-urgency term based on hours until the event

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{EventCategory, PriorityLabel, WeatherCondition, WeatherSnapshot};

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

/// Added when temperature is below 0°C or above 35°C
pub const EXTREME_TEMPERATURE_BONUS: i32 = 10;
pub const FREEZING_CELSIUS: i64 = 0;
pub const HEAT_CELSIUS: i64 = 35;

/// Added when wind speed exceeds `HIGH_WIND_MPS`
pub const HIGH_WIND_BONUS: i32 = 5;
pub const HIGH_WIND_MPS: i64 = 10;

pub const URGENT_WINDOW_HOURS: f64 = 24.0;
pub const URGENT_BONUS: i32 = 25;
pub const SOON_WINDOW_HOURS: f64 = 72.0;
pub const SOON_BONUS: i32 = 10;

pub const CRITICAL_THRESHOLD: u8 = 75;
pub const HIGH_THRESHOLD: u8 = 55;
pub const MEDIUM_THRESHOLD: u8 = 35;
pub const LOW_THRESHOLD: u8 = 15;

/// A computed score together with its label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityScore {
    pub score: u8,
    pub label: PriorityLabel,
}

/// Base weight contributed by the event category
pub fn category_weight(category: EventCategory) -> i32 {
    match category {
        EventCategory::Emergency => 60,
        EventCategory::Medical => 55,
        EventCategory::Construction => 40,
        EventCategory::OutdoorWork => 35,
        EventCategory::GardenMaintenance => 30,
        EventCategory::Travel => 30,
        EventCategory::Sports => 25,
        EventCategory::Exercise => 25,
        EventCategory::Meeting => 25,
        EventCategory::SocialEvent => 20,
        EventCategory::Shopping => 15,
        EventCategory::IndoorWork => 10,
        EventCategory::Study => 10,
    }
}

/// Additive weight of a weather condition
pub fn condition_weight(condition: WeatherCondition) -> i32 {
    match condition {
        WeatherCondition::Clear | WeatherCondition::Unknown => 0,
        WeatherCondition::Clouds | WeatherCondition::Mist => 5,
        WeatherCondition::Drizzle => 8,
        WeatherCondition::Rain => 10,
        WeatherCondition::Snow => 15,
        WeatherCondition::Thunderstorm | WeatherCondition::Extreme => 20,
    }
}

/// Weather contribution to the score
pub fn weather_weight(weather: &WeatherSnapshot) -> i32 {
    let mut weight = condition_weight(weather.condition);

    if weather.temperature_celsius < Decimal::from(FREEZING_CELSIUS)
        || weather.temperature_celsius > Decimal::from(HEAT_CELSIUS)
    {
        weight += EXTREME_TEMPERATURE_BONUS;
    }

    if weather.wind_speed_mps > Decimal::from(HIGH_WIND_MPS) {
        weight += HIGH_WIND_BONUS;
    }

    weight
}

/// Hours from `now` until `scheduled_at`, negative when overdue
pub fn hours_until(scheduled_at: NaiveDateTime, now: NaiveDateTime) -> f64 {
    (scheduled_at - now).num_minutes() as f64 / 60.0
}

/// Time-urgency contribution; overdue events count as urgent
pub fn urgency_weight(scheduled_at: NaiveDateTime, now: NaiveDateTime) -> i32 {
    let hours = hours_until(scheduled_at, now);
    if hours < URGENT_WINDOW_HOURS {
        URGENT_BONUS
    } else if hours < SOON_WINDOW_HOURS {
        SOON_BONUS
    } else {
        0
    }
}

/// Map a clamped score onto its label
pub fn priority_label(score: u8) -> PriorityLabel {
    if score >= CRITICAL_THRESHOLD {
        PriorityLabel::Critical
    } else if score >= HIGH_THRESHOLD {
        PriorityLabel::High
    } else if score >= MEDIUM_THRESHOLD {
        PriorityLabel::Medium
    } else if score >= LOW_THRESHOLD {
        PriorityLabel::Low
    } else {
        PriorityLabel::VeryLow
    }
}

/// Score an event
///
/// Pure: identical inputs (including `now`) always give the same result.
/// Missing weather skips the weather term.
pub fn score(
    category: EventCategory,
    weather: Option<&WeatherSnapshot>,
    scheduled_at: NaiveDateTime,
    now: NaiveDateTime,
) -> PriorityScore {
    let raw = category_weight(category)
        + weather.map(weather_weight).unwrap_or(0)
        + urgency_weight(scheduled_at, now);

    let score = raw.clamp(MIN_SCORE, MAX_SCORE) as u8;

    PriorityScore {
        score,
        label: priority_label(score),
    }
}
