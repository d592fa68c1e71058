//! Weather abstractions and core types

use crate::core::error::FetchError;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("'{0}' is not a supported city")]
    UnsupportedCity(String),

    #[error("No geocoding result for {0}")]
    NotFound(String),

    #[error("Invalid coordinates: latitude must be -90 to 90, longitude must be -180 to 180")]
    InvalidCoordinates,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Korean city names and the English names the geocoder understands.
pub const CITY_MAP: &[(&str, &str)] = &[
    ("서울", "Seoul"),
    ("세종", "Sejong"),
    ("부산", "Busan"),
    ("대구", "Daegu"),
    ("인천", "Incheon"),
    ("광주", "Gwangju"),
    ("대전", "Daejeon"),
    ("울산", "Ulsan"),
    ("수원", "Suwon"),
    ("춘천", "Chuncheon"),
    ("청주", "Cheongju"),
    ("홍성", "Hongseong"),
    ("전주", "Jeonju"),
    ("무안", "Muan"),
    ("안동", "Andong"),
    ("창원", "Changwon"),
    ("제주", "Jeju"),
];

/// A city the geocoder can be asked about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct City {
    pub name: String,
    pub name_en: String,
}

impl City {
    /// Resolves a Korean name, or an English name case-insensitively, against
    /// [`CITY_MAP`].
    pub fn lookup(input: &str) -> Result<Self, WeatherError> {
        let input = input.trim();
        CITY_MAP
            .iter()
            .find(|(kr, en)| *kr == input || en.eq_ignore_ascii_case(input))
            .map(|(kr, en)| City {
                name: (*kr).to_string(),
                name_en: (*en).to_string(),
            })
            .ok_or_else(|| WeatherError::UnsupportedCity(input.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    pub name_en: String,
    pub latitude: f64,
    pub longitude: f64,
    pub admin1: Option<String>,
    pub country: Option<String>,
}

impl Location {
    pub fn validate(&self) -> Result<(), WeatherError> {
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(WeatherError::InvalidCoordinates);
        }
        Ok(())
    }
}

/// Coarse condition derived from a WMO weather code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Overcast,
    Fog,
    Rain,
    Snow,
    Showers,
    Thunderstorm,
    Unknown(i32),
}

impl WeatherCondition {
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1 | 2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51 | 53 | 55 | 61 | 63 | 65 => Self::Rain,
            71 | 73 | 75 | 77 | 85 | 86 => Self::Snow,
            80..=82 => Self::Showers,
            95 | 96 | 99 => Self::Thunderstorm,
            other => Self::Unknown(other),
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::PartlyCloudy => "🌤",
            Self::Overcast => "☁️",
            Self::Fog => "🌫",
            Self::Rain => "🌧",
            Self::Snow => "❄️",
            Self::Showers => "🌦",
            Self::Thunderstorm => "⛈",
            Self::Unknown(_) => "❓",
        }
    }
}

impl Display for WeatherCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clear => write!(f, "Clear"),
            Self::PartlyCloudy => write!(f, "Partly cloudy"),
            Self::Overcast => write!(f, "Overcast"),
            Self::Fog => write!(f, "Fog"),
            Self::Rain => write!(f, "Rain"),
            Self::Snow => write!(f, "Snow"),
            Self::Showers => write!(f, "Showers"),
            Self::Thunderstorm => write!(f, "Thunderstorm"),
            Self::Unknown(code) => write!(f, "Code {code}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub time: Option<NaiveDateTime>,
    pub temperature: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation: Option<f64>,
    pub wind_speed: Option<f64>,
    pub weather_code: Option<i32>,
}

impl CurrentWeather {
    pub fn condition(&self) -> Option<WeatherCondition> {
        self.weather_code.map(WeatherCondition::from_wmo_code)
    }
}

/// Display units reported alongside a set of measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct Units {
    pub temperature: String,
    pub humidity: String,
    pub precipitation: String,
    pub wind_speed: String,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            temperature: "°C".to_string(),
            humidity: "%".to_string(),
            precipitation: "mm".to_string(),
            wind_speed: "km/h".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub precipitation_sum: Option<f64>,
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyForecast {
    pub time: NaiveDateTime,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation: Option<f64>,
    pub wind_speed: Option<f64>,
    pub weather_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub timezone: String,
    pub current: CurrentWeather,
    pub units: Units,
    /// Units of the hourly series, which may differ from the current ones.
    pub hourly_units: Units,
    pub daily: Vec<DailyForecast>,
    pub hourly: Vec<HourlyForecast>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForecastOptions {
    pub days: u8,
    pub timezone: String,
    pub hourly: bool,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            days: 7,
            timezone: "Asia/Seoul".to_string(),
            hourly: true,
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn geocode(&self, city: &City) -> Result<Location, WeatherError>;

    async fn forecast(
        &self,
        location: &Location,
        options: &ForecastOptions,
    ) -> Result<Forecast, WeatherError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_lookup_korean_and_english() {
        let city = City::lookup("세종").unwrap();
        assert_eq!(city.name_en, "Sejong");

        let city = City::lookup(" busan ").unwrap();
        assert_eq!(city.name, "부산");
        assert_eq!(city.name_en, "Busan");
    }

    #[test]
    fn test_city_lookup_unsupported() {
        let err = City::lookup("평양").unwrap_err();
        assert!(matches!(err, WeatherError::UnsupportedCity(ref c) if c == "평양"));
        assert_eq!(err.to_string(), "'평양' is not a supported city");
    }

    #[test]
    fn test_city_map_has_all_cities() {
        assert_eq!(CITY_MAP.len(), 17);
    }

    #[test]
    fn test_weather_condition_mapping() {
        assert_eq!(WeatherCondition::from_wmo_code(0), WeatherCondition::Clear);
        assert_eq!(
            WeatherCondition::from_wmo_code(2),
            WeatherCondition::PartlyCloudy
        );
        assert_eq!(WeatherCondition::from_wmo_code(48), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_wmo_code(63), WeatherCondition::Rain);
        assert_eq!(WeatherCondition::from_wmo_code(86), WeatherCondition::Snow);
        assert_eq!(WeatherCondition::from_wmo_code(81), WeatherCondition::Showers);
        assert_eq!(
            WeatherCondition::from_wmo_code(99),
            WeatherCondition::Thunderstorm
        );
        assert_eq!(
            WeatherCondition::from_wmo_code(56),
            WeatherCondition::Unknown(56)
        );
        assert_eq!(WeatherCondition::Unknown(56).to_string(), "Code 56");
    }

    #[test]
    fn test_location_validate() {
        let mut location = Location {
            name: "세종".to_string(),
            name_en: "Sejong".to_string(),
            latitude: 36.48,
            longitude: 127.29,
            admin1: None,
            country: None,
        };
        assert!(location.validate().is_ok());

        location.latitude = 91.0;
        assert!(matches!(
            location.validate(),
            Err(WeatherError::InvalidCoordinates)
        ));
    }
}
