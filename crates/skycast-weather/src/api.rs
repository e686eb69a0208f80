//! Wire types for the OpenWeather 5 day / 3 hour `/forecast` endpoint.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::{ForecastEntry, WeatherCondition};

/// Status code that marks a successful body.
pub const SUCCESS_CODE: &str = "200";

/// Full `/forecast` response body.
///
/// Error bodies reuse the same envelope: `{"cod": "404", "message": "city not found"}`.
/// `cod` arrives as a string on success and sometimes as a number on errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(deserialize_with = "code_as_string")]
    pub cod: String,
    /// A number on success, the error text otherwise
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub cnt: u32,
    #[serde(default)]
    pub list: Vec<RawEntry>,
    #[serde(default)]
    pub city: Option<RawCity>,
}

impl ForecastResponse {
    pub fn is_success(&self) -> bool {
        self.cod == SUCCESS_CODE
    }

    /// The error text carried by a non-success body.
    pub fn error_message(&self) -> String {
        match &self.message {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Null) | None => format!("request failed with code {}", self.cod),
            Some(other) => other.to_string(),
        }
    }

    pub fn city_name(&self) -> &str {
        self.city.as_ref().map(|c| c.name.as_str()).unwrap_or_default()
    }

    /// Seconds east of UTC for the forecast city, 0 if absent.
    pub fn utc_offset_secs(&self) -> i32 {
        self.city.as_ref().map(|c| c.timezone).unwrap_or(0)
    }
}

fn code_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for cod, got {}",
            other
        ))),
    }
}

/// One 3-hour slot of the raw list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntry {
    pub dt: i64,
    pub main: RawMain,
    #[serde(default)]
    pub weather: Vec<RawCondition>,
    #[serde(default)]
    pub wind: Option<RawWind>,
    #[serde(default)]
    pub pop: Option<f64>,
    #[serde(default)]
    pub dt_txt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMain {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCondition {
    pub id: u16,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWind {
    pub speed: f64,
    #[serde(default)]
    pub deg: Option<f64>,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCity {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub coord: Option<RawCoord>,
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCoord {
    pub lat: f64,
    pub lon: f64,
}

impl From<&RawEntry> for ForecastEntry {
    fn from(raw: &RawEntry) -> Self {
        let primary = raw.weather.first();
        Self {
            timestamp: raw.dt,
            temperature: raw.main.temp,
            humidity: raw.main.humidity.round().clamp(0.0, 100.0) as u8,
            wind_speed: raw.wind.as_ref().map(|w| w.speed).unwrap_or(0.0),
            condition_description: primary.map(|c| c.description.clone()).unwrap_or_default(),
            condition: primary
                .map(|c| WeatherCondition::from_owm_id(c.id))
                .unwrap_or_default(),
        }
    }
}
