use crate::core::cache::Cache;
use crate::core::currency::{RateSnapshot, RateSnapshotProvider, normalize_code};
use crate::core::error::FetchError;
use crate::core::weather::{City, Forecast, ForecastOptions, Location, WeatherError, WeatherProvider};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const GEOCODE_TTL: Duration = Duration::from_secs(10 * 60);
pub const FORECAST_TTL: Duration = Duration::from_secs(5 * 60);

// Caching for RateSnapshotProvider. Failures are never cached.
pub struct CachingRateProvider<T: RateSnapshotProvider> {
    inner: T,
    cache: Cache<String, RateSnapshot>,
}

impl<T: RateSnapshotProvider> CachingRateProvider<T> {
    pub fn new(inner: T, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::with_ttl(ttl),
        }
    }
}

#[async_trait]
impl<T: RateSnapshotProvider> RateSnapshotProvider for CachingRateProvider<T> {
    async fn latest(&self, base: &str) -> Result<RateSnapshot, FetchError> {
        let key = normalize_code(base);
        if let Some(snapshot) = self.cache.get(&key).await {
            debug!("Cache hit for rate snapshot: {}", key);
            return Ok(snapshot);
        }
        debug!("Cache miss for rate snapshot: {}", key);
        let snapshot = self.inner.latest(&key).await?;
        self.cache.put(key, snapshot.clone()).await;
        Ok(snapshot)
    }
}

// Caching for WeatherProvider
pub struct CachingWeatherProvider<T: WeatherProvider> {
    inner: T,
    locations: Cache<City, Location>,
    forecasts: Cache<String, Forecast>,
}

impl<T: WeatherProvider> CachingWeatherProvider<T> {
    pub fn new(inner: T) -> Self {
        Self::with_ttls(inner, GEOCODE_TTL, FORECAST_TTL)
    }

    pub fn with_ttls(inner: T, geocode_ttl: Duration, forecast_ttl: Duration) -> Self {
        Self {
            inner,
            locations: Cache::with_ttl(geocode_ttl),
            forecasts: Cache::with_ttl(forecast_ttl),
        }
    }
}

fn forecast_key(location: &Location, options: &ForecastOptions) -> String {
    format!(
        "{:.4},{:.4}|{}|{}|{}",
        location.latitude, location.longitude, options.days, options.timezone, options.hourly
    )
}

#[async_trait]
impl<T: WeatherProvider> WeatherProvider for CachingWeatherProvider<T> {
    async fn geocode(&self, city: &City) -> Result<Location, WeatherError> {
        if let Some(location) = self.locations.get(city).await {
            return Ok(location);
        }
        let location = self.inner.geocode(city).await?;
        self.locations.put(city.clone(), location.clone()).await;
        Ok(location)
    }

    async fn forecast(
        &self,
        location: &Location,
        options: &ForecastOptions,
    ) -> Result<Forecast, WeatherError> {
        let key = forecast_key(location, options);
        if let Some(forecast) = self.forecasts.get(&key).await {
            return Ok(forecast);
        }
        let forecast = self.inner.forecast(location, options).await?;
        self.forecasts.put(key, forecast.clone()).await;
        Ok(forecast)
    }
}
