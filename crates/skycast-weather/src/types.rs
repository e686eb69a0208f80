use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use skycast_core::Units;

/// Weather condition categories mapped from OpenWeather condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Atmosphere,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeather condition id to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_id(id: u16) -> Self {
        match id {
            200..=299 => Self::Thunderstorm,
            300..=399 => Self::Drizzle,
            500..=504 => Self::Rain,
            511 => Self::Sleet, // Freezing rain
            520..=599 => Self::HeavyRain,
            611..=616 => Self::Sleet,
            600..=699 => Self::Snow,
            700..=799 => Self::Atmosphere,
            800 => Self::Clear,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // Unknown ids default to clear
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Atmosphere => "Mist",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Geographic position from the location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components within their geographic ranges.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// One forecast slot as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Epoch seconds (UTC)
    pub timestamp: i64,
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: u8,
    pub wind_speed: f64,
    pub condition_description: String,
    pub condition: WeatherCondition,
}

impl ForecastEntry {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// Calendar day of this entry at the given UTC offset.
    pub fn local_date(&self, offset: FixedOffset) -> Option<NaiveDate> {
        calendar_day(self.timestamp, offset)
    }
}

/// Calendar day of an epoch-seconds timestamp at `offset`.
pub fn calendar_day(timestamp: i64, offset: FixedOffset) -> Option<NaiveDate> {
    offset
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.date_naive())
}

/// The display-ready forecast. Replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastList {
    pub city_name: String,
    pub country: Option<String>,
    pub units: Units,
    /// Seconds east of UTC for the forecast city
    pub utc_offset_secs: i32,
    /// The earliest slot of the response, shown as today's conditions
    pub current: Option<ForecastEntry>,
    /// At most five upcoming days, ascending
    pub entries: Vec<ForecastEntry>,
}

impl ForecastList {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(utc_offset)
    }
}

/// A previously searched city, persisted by the recent-locations store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentLocation {
    pub city_name: String,
    /// Epoch milliseconds
    pub searched_at: i64,
}

impl RecentLocation {
    pub fn new(city_name: impl Into<String>, searched_at: i64) -> Self {
        Self {
            city_name: city_name.into(),
            searched_at,
        }
    }

    /// Record a search happening now.
    pub fn now(city_name: impl Into<String>) -> Self {
        Self::new(city_name, Utc::now().timestamp_millis())
    }
}

/// The zero offset, used when a response carries no usable timezone.
pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owm_thunderstorm() {
        assert_eq!(WeatherCondition::from_owm_id(200), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_owm_id(232), WeatherCondition::Thunderstorm);
    }

    #[test]
    fn test_owm_drizzle() {
        assert_eq!(WeatherCondition::from_owm_id(300), WeatherCondition::Drizzle);
        assert_eq!(WeatherCondition::from_owm_id(321), WeatherCondition::Drizzle);
    }

    #[test]
    fn test_owm_rain() {
        assert_eq!(WeatherCondition::from_owm_id(500), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_id(504), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_owm_id(511), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_owm_id(522), WeatherCondition::HeavyRain);
    }

    #[test]
    fn test_owm_snow() {
        assert_eq!(WeatherCondition::from_owm_id(600), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_owm_id(611), WeatherCondition::Sleet);
        assert_eq!(WeatherCondition::from_owm_id(622), WeatherCondition::Snow);
    }

    #[test]
    fn test_owm_clear_and_clouds() {
        assert_eq!(WeatherCondition::from_owm_id(701), WeatherCondition::Atmosphere);
        assert_eq!(WeatherCondition::from_owm_id(800), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_id(802), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_owm_id(804), WeatherCondition::Cloudy);
    }

    #[test]
    fn test_owm_unknown_defaults_to_clear() {
        assert_eq!(WeatherCondition::from_owm_id(999), WeatherCondition::Clear);
        assert_eq!(WeatherCondition::from_owm_id(0), WeatherCondition::Clear);
    }

    #[test]
    fn test_condition_description() {
        assert_eq!(WeatherCondition::Clear.description(), "Clear");
        assert_eq!(WeatherCondition::Thunderstorm.description(), "Thunderstorm");
    }

    #[test]
    fn test_coordinates_validity() {
        assert!(Coordinates::new(47.6, -122.3).is_valid());
        assert!(!Coordinates::new(95.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -181.0).is_valid());
    }

    #[test]
    fn test_calendar_day_respects_offset() {
        // 2024-03-01 23:00:00 UTC
        let ts = 1_709_334_000;
        let utc = FixedOffset::east_opt(0).unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            calendar_day(ts, utc),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            calendar_day(ts, plus_two),
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
    }

    #[test]
    fn test_recent_location_serializes_camel_case() {
        let recent = RecentLocation::new("Lisbon", 1_700_000_000_000);
        let json = serde_json::to_value(&recent).unwrap();
        assert_eq!(json["cityName"], "Lisbon");
        assert_eq!(json["searchedAt"], 1_700_000_000_000_i64);
    }
}
