//! Core business logic abstractions

pub mod cache;
pub mod chat;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod weather;

// Re-export main types for cleaner imports
pub use chat::{ChatError, ChatMessage, ChatProvider, ChatRequest, ChatSession, Role};
pub use currency::{RateError, RateSnapshot, RateSnapshotProvider, convert};
pub use error::FetchError;
pub use weather::{City, Forecast, ForecastOptions, Location, WeatherError, WeatherProvider};
