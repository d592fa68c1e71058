pub mod caching;
pub mod open_er_api;
pub mod open_meteo;
pub mod openai;
pub mod util;

pub use caching::{CachingRateProvider, CachingWeatherProvider};
