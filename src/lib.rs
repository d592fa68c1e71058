pub mod cli;
pub mod core;
pub mod providers;

use crate::core::chat::ChatSession;
use crate::core::config::AppConfig;
use crate::core::weather::ForecastOptions;
use crate::providers::open_er_api::OpenErApiProvider;
use crate::providers::open_meteo::OpenMeteoProvider;
use crate::providers::openai::OpenAiCompatibleProvider;
use crate::providers::{CachingRateProvider, CachingWeatherProvider};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Rates {
        base: Option<String>,
        targets: Option<Vec<String>>,
        amount: Option<f64>,
        csv: Option<PathBuf>,
    },
    Convert {
        amount: f64,
        from: String,
        to: String,
        base: Option<String>,
    },
    Weather {
        city: Option<String>,
        days: Option<u8>,
        hourly: bool,
    },
    Chat {
        model: Option<String>,
        temperature: Option<f32>,
        system_prompt: Option<String>,
    },
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

fn rate_provider(config: &AppConfig) -> Result<CachingRateProvider<OpenErApiProvider>> {
    let inner = OpenErApiProvider::new(&config.rates.base_url, config.rates.timeout_secs)
        .context("Failed to create exchange rate client")?;
    Ok(CachingRateProvider::new(
        inner,
        Duration::from_secs(config.rates.cache_ttl_secs),
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    match command {
        AppCommand::Rates {
            base,
            targets,
            amount,
            csv,
        } => {
            let provider = rate_provider(&config)?;
            let options = cli::rates::RatesOptions {
                base: base.unwrap_or(config.rates.base),
                targets: targets.unwrap_or(config.rates.targets),
                amount: amount.unwrap_or(config.rates.amount),
                csv,
            };
            cli::rates::run(&provider, &options).await
        }
        AppCommand::Convert {
            amount,
            from,
            to,
            base,
        } => {
            let provider = rate_provider(&config)?;
            let base = base.unwrap_or_else(|| config.rates.base.clone());
            cli::rates::run_convert(&provider, &base, amount, &from, &to).await
        }
        AppCommand::Weather { city, days, hourly } => {
            let inner = OpenMeteoProvider::new(
                &config.weather.geocoding_url,
                &config.weather.forecast_url,
                config.weather.timeout_secs,
            )
            .context("Failed to create weather client")?;
            let provider = CachingWeatherProvider::new(inner);
            let options = ForecastOptions {
                days: days.unwrap_or(config.weather.forecast_days),
                timezone: config.weather.timezone.clone(),
                hourly,
            };
            let city = city.unwrap_or_else(|| config.weather.default_city.clone());
            cli::weather::run(&provider, &city, &options).await
        }
        AppCommand::Chat {
            model,
            temperature,
            system_prompt,
        } => {
            let api_key = config.chat.resolve_api_key().unwrap_or_default();
            let provider = OpenAiCompatibleProvider::new(
                &config.chat.base_url,
                &api_key,
                config.chat.timeout_secs,
            )?;
            let model = model.unwrap_or_else(|| config.chat.model.clone());
            let system_prompt = system_prompt.or_else(|| config.chat.system_prompt.clone());
            let mut session = ChatSession::new(
                &model,
                system_prompt.as_deref(),
                temperature.unwrap_or(config.chat.temperature),
            );
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            cli::chat::run(&provider, &mut session, stdin, &mut stdout).await
        }
    }
}
