//! Open-Meteo geocoding and forecast client.

use crate::core::error::FetchError;
use crate::core::weather::{
    City, CurrentWeather, DailyForecast, Forecast, ForecastOptions, HourlyForecast, Location,
    Units, WeatherError, WeatherProvider,
};
use crate::providers::util::{build_client, check_status, with_retry};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,weather_code,wind_speed_10m";
const DAILY_FIELDS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_sum,sunrise,sunset";
const HOURLY_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,precipitation,weather_code,wind_speed_10m";

pub struct OpenMeteoProvider {
    geocoding_url: String,
    forecast_url: String,
    client: Client,
}

impl OpenMeteoProvider {
    pub fn new(
        geocoding_url: &str,
        forecast_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, FetchError> {
        Ok(OpenMeteoProvider {
            geocoding_url: geocoding_url.trim_end_matches('/').to_string(),
            forecast_url: forecast_url.trim_end_matches('/').to_string(),
            client: build_client(timeout_secs)?,
        })
    }

    fn geocode_url(&self, city: &City) -> Result<Url, FetchError> {
        Url::parse_with_params(
            &format!("{}/search", self.geocoding_url),
            &[
                ("name", city.name_en.as_str()),
                ("count", "1"),
                ("language", "ko"),
                ("country_code", "KR"),
                ("format", "json"),
            ],
        )
        .map_err(|e| FetchError::Malformed(format!("Invalid geocoding URL: {e}")))
    }

    fn forecast_url(&self, location: &Location, options: &ForecastOptions) -> Result<Url, FetchError> {
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();
        let days = options.days.clamp(1, 16).to_string();

        let mut params = vec![
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("current", CURRENT_FIELDS),
            ("daily", DAILY_FIELDS),
            ("forecast_days", days.as_str()),
            ("timezone", options.timezone.as_str()),
        ];
        if options.hourly {
            params.push(("hourly", HOURLY_FIELDS));
        }

        Url::parse_with_params(&format!("{}/forecast", self.forecast_url), &params)
            .map_err(|e| FetchError::Malformed(format!("Invalid forecast URL: {e}")))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T, FetchError> {
        let response = with_retry(
            || async {
                self.client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(FetchError::from)
            },
            3,
            500,
        )
        .await?;

        // Open-Meteo explains rejected parameters in the body of a 400
        if response.status() == StatusCode::BAD_REQUEST {
            let text = response.text().await?;
            let reason = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.reason)
                .unwrap_or(text);
            return Err(FetchError::Upstream(reason));
        }

        let response = check_status(response)?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
    admin1: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    current: Option<CurrentData>,
    #[serde(default)]
    current_units: HashMap<String, String>,
    #[serde(default)]
    hourly_units: HashMap<String, String>,
    #[serde(default)]
    daily: Option<DailyData>,
    #[serde(default)]
    hourly: Option<HourlyData>,
}

#[derive(Debug, Deserialize)]
struct CurrentData {
    time: Option<String>,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    precipitation: Option<f64>,
    weather_code: Option<i32>,
    wind_speed_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DailyData {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    sunrise: Vec<Option<String>>,
    #[serde(default)]
    sunset: Vec<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct HourlyData {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
}

fn at<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

/// Parses Open-Meteo local times such as `2026-02-05T14:00`.
fn parse_local_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn parse_units(units: &HashMap<String, String>) -> Units {
    let defaults = Units::default();
    let pick = |key: &str, fallback: String| units.get(key).cloned().unwrap_or(fallback);
    Units {
        temperature: pick("temperature_2m", defaults.temperature),
        humidity: pick("relative_humidity_2m", defaults.humidity),
        precipitation: pick("precipitation", defaults.precipitation),
        wind_speed: pick("wind_speed_10m", defaults.wind_speed),
    }
}

fn parse_current(data: Option<CurrentData>) -> CurrentWeather {
    match data {
        Some(data) => CurrentWeather {
            time: data.time.as_deref().and_then(parse_local_time),
            temperature: data.temperature_2m,
            apparent_temperature: data.apparent_temperature,
            humidity: data.relative_humidity_2m,
            precipitation: data.precipitation,
            wind_speed: data.wind_speed_10m,
            weather_code: data.weather_code,
        },
        None => CurrentWeather {
            time: None,
            temperature: None,
            apparent_temperature: None,
            humidity: None,
            precipitation: None,
            wind_speed: None,
            weather_code: None,
        },
    }
}

fn parse_daily(data: &DailyData) -> Result<Vec<DailyForecast>, FetchError> {
    data.time
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .map_err(|e| FetchError::Malformed(format!("Invalid date '{day}': {e}")))?;
            let time_at = |values: &[Option<String>]| {
                values
                    .get(i)
                    .and_then(|v| v.as_deref())
                    .and_then(parse_local_time)
            };
            Ok(DailyForecast {
                date,
                temperature_max: at(&data.temperature_2m_max, i),
                temperature_min: at(&data.temperature_2m_min, i),
                precipitation_sum: at(&data.precipitation_sum, i),
                sunrise: time_at(&data.sunrise),
                sunset: time_at(&data.sunset),
            })
        })
        .collect()
}

fn parse_hourly(data: &HourlyData) -> Result<Vec<HourlyForecast>, FetchError> {
    data.time
        .iter()
        .enumerate()
        .map(|(i, time)| {
            let time = parse_local_time(time)
                .ok_or_else(|| FetchError::Malformed(format!("Invalid time '{time}'")))?;
            Ok(HourlyForecast {
                time,
                temperature: at(&data.temperature_2m, i),
                humidity: at(&data.relative_humidity_2m, i),
                precipitation: at(&data.precipitation, i),
                wind_speed: at(&data.wind_speed_10m, i),
                weather_code: at(&data.weather_code, i),
            })
        })
        .collect()
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    #[instrument(name = "OpenMeteoGeocode", skip(self), fields(city = %city.name_en))]
    async fn geocode(&self, city: &City) -> Result<Location, WeatherError> {
        let url = self.geocode_url(city)?;
        debug!("Requesting geocoding from {}", url);

        let data: GeocodingResponse = self.get_json(url).await?;
        let top = data
            .results
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::NotFound(format!("{} ({})", city.name, city.name_en)))?;

        let location = Location {
            name: city.name.clone(),
            name_en: city.name_en.clone(),
            latitude: top.latitude,
            longitude: top.longitude,
            admin1: top.admin1,
            country: top.country,
        };
        location.validate()?;
        Ok(location)
    }

    #[instrument(
        name = "OpenMeteoForecast",
        skip(self, location),
        fields(lat = %location.latitude, lon = %location.longitude, days = options.days)
    )]
    async fn forecast(
        &self,
        location: &Location,
        options: &ForecastOptions,
    ) -> Result<Forecast, WeatherError> {
        location.validate()?;
        let url = self.forecast_url(location, options)?;
        debug!("Requesting forecast from {}", url);

        let data: ForecastResponse = self.get_json(url).await?;
        let daily = match &data.daily {
            Some(daily) => parse_daily(daily)?,
            None => Vec::new(),
        };
        let hourly = match &data.hourly {
            Some(hourly) => parse_hourly(hourly)?,
            None => Vec::new(),
        };

        Ok(Forecast {
            timezone: data.timezone.unwrap_or_else(|| options.timezone.clone()),
            units: parse_units(&data.current_units),
            hourly_units: parse_units(&data.hourly_units),
            current: parse_current(data.current),
            daily,
            hourly,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sejong() -> Location {
        Location {
            name: "세종".to_string(),
            name_en: "Sejong".to_string(),
            latitude: 36.48,
            longitude: 127.29,
            admin1: None,
            country: None,
        }
    }

    const FORECAST_BODY: &str = r#"{
        "timezone": "Asia/Seoul",
        "current_units": {"temperature_2m": "°C", "wind_speed_10m": "m/s"},
        "current": {
            "time": "2026-10-16T12:00",
            "temperature_2m": 18.4,
            "relative_humidity_2m": 55,
            "apparent_temperature": 17.1,
            "precipitation": 0.0,
            "weather_code": 2,
            "wind_speed_10m": 3.2
        },
        "daily": {
            "time": ["2026-10-16", "2026-10-17"],
            "temperature_2m_max": [21.0, null],
            "temperature_2m_min": [10.5, 9.8],
            "precipitation_sum": [0.0, 4.2],
            "sunrise": ["2026-10-16T06:38", "2026-10-17T06:39"],
            "sunset": ["2026-10-16T18:02", "2026-10-17T18:01"]
        },
        "hourly_units": {"temperature_2m": "°F", "wind_speed_10m": "mp/h"},
        "hourly": {
            "time": ["2026-10-16T00:00", "2026-10-16T01:00"],
            "temperature_2m": [12.0, 11.6],
            "relative_humidity_2m": [80, 82],
            "precipitation": [0.0, 0.1],
            "weather_code": [1, 61],
            "wind_speed_10m": [1.5, 1.8]
        }
    }"#;

    #[tokio::test]
    async fn test_successful_geocode() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("name", "Sejong"))
            .and(query_param("country_code", "KR"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"results": [{"name": "세종", "latitude": 36.48, "longitude": 127.29, "admin1": "세종특별자치시", "country": "대한민국"}]}"#,
            ))
            .mount(&mock_server)
            .await;

        let provider = OpenMeteoProvider::new(&mock_server.uri(), &mock_server.uri(), 20).unwrap();
        let city = City::lookup("세종").unwrap();
        let location = provider.geocode(&city).await.unwrap();

        assert_eq!(location.name, "세종");
        assert_eq!(location.name_en, "Sejong");
        assert_eq!(location.latitude, 36.48);
        assert_eq!(location.admin1.as_deref(), Some("세종특별자치시"));
    }

    #[tokio::test]
    async fn test_geocode_without_results() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"generationtime_ms": 0.5}"#))
            .mount(&mock_server)
            .await;

        let provider = OpenMeteoProvider::new(&mock_server.uri(), &mock_server.uri(), 20).unwrap();
        let city = City::lookup("Muan").unwrap();
        let err = provider.geocode(&city).await.unwrap_err();

        assert!(matches!(err, WeatherError::NotFound(_)));
        assert_eq!(err.to_string(), "No geocoding result for 무안 (Muan)");
    }

    #[tokio::test]
    async fn test_successful_forecast() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("forecast_days", "7"))
            .and(query_param("timezone", "Asia/Seoul"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_BODY))
            .mount(&mock_server)
            .await;

        let provider = OpenMeteoProvider::new(&mock_server.uri(), &mock_server.uri(), 25).unwrap();
        let forecast = provider
            .forecast(&sejong(), &ForecastOptions::default())
            .await
            .unwrap();

        assert_eq!(forecast.timezone, "Asia/Seoul");
        assert_eq!(forecast.current.temperature, Some(18.4));
        assert_eq!(forecast.current.humidity, Some(55.0));
        assert_eq!(
            forecast.current.condition(),
            Some(crate::core::weather::WeatherCondition::PartlyCloudy)
        );
        assert_eq!(forecast.units.wind_speed, "m/s");
        assert_eq!(forecast.units.humidity, "%");

        assert_eq!(forecast.daily.len(), 2);
        assert_eq!(forecast.daily[0].temperature_max, Some(21.0));
        assert_eq!(forecast.daily[1].temperature_max, None);
        assert_eq!(
            forecast.daily[0].sunrise.unwrap().format("%H:%M").to_string(),
            "06:38"
        );

        assert_eq!(forecast.hourly.len(), 2);
        assert_eq!(forecast.hourly[1].weather_code, Some(61));
        assert_eq!(forecast.hourly_units.temperature, "°F");
        assert_eq!(forecast.hourly_units.wind_speed, "mp/h");
        assert_eq!(forecast.hourly_units.precipitation, "mm");
    }

    #[tokio::test]
    async fn test_forecast_days_are_clamped() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("forecast_days", "16"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_BODY))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = OpenMeteoProvider::new(&mock_server.uri(), &mock_server.uri(), 25).unwrap();
        let options = ForecastOptions {
            days: 30,
            ..ForecastOptions::default()
        };
        assert!(provider.forecast(&sejong(), &options).await.is_ok());
    }

    #[tokio::test]
    async fn test_forecast_bad_request_reason() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"error": true, "reason": "Cannot initialize WeatherVariable from invalid String value"}"#,
            ))
            .mount(&mock_server)
            .await;

        let provider = OpenMeteoProvider::new(&mock_server.uri(), &mock_server.uri(), 25).unwrap();
        let err = provider
            .forecast(&sejong(), &ForecastOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Fetch(FetchError::Upstream(_))));
        assert!(err.to_string().contains("invalid String value"));
    }

    #[tokio::test]
    async fn test_forecast_rejects_invalid_coordinates() {
        let provider =
            OpenMeteoProvider::new("http://127.0.0.1:9", "http://127.0.0.1:9", 1).unwrap();
        let mut location = sejong();
        location.longitude = 200.0;

        let err = provider
            .forecast(&location, &ForecastOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::InvalidCoordinates));
    }

    #[test]
    fn test_invalid_base_url_is_not_retried() {
        let provider = OpenMeteoProvider::new("not a url", "not a url", 1).unwrap();
        let city = City::lookup("서울").unwrap();

        let err = provider.geocode_url(&city).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
        assert!(!err.is_transient());

        let err = provider
            .forecast_url(&sejong(), &ForecastOptions::default())
            .unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_forecast_url_without_hourly() {
        let provider =
            OpenMeteoProvider::new("http://localhost", "http://localhost", 1).unwrap();
        let options = ForecastOptions {
            hourly: false,
            ..ForecastOptions::default()
        };
        let url = provider.forecast_url(&sejong(), &options).unwrap();
        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(query.get("latitude").map(String::as_str), Some("36.48"));
        assert_eq!(query.get("daily").map(String::as_str), Some(DAILY_FIELDS));
        assert!(!query.contains_key("hourly"));
    }
}
