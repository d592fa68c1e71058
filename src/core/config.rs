use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RatesConfig {
    pub base_url: String,
    pub base: String,
    pub targets: Vec<String>,
    pub amount: f64,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            base_url: "https://open.er-api.com/v6/latest".to_string(),
            base: "USD".to_string(),
            targets: ["KRW", "JPY", "EUR", "CNY", "GBP"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            amount: 100.0,
            cache_ttl_secs: 60,
            timeout_secs: 8,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WeatherConfig {
    pub geocoding_url: String,
    pub forecast_url: String,
    pub timezone: String,
    pub forecast_days: u8,
    pub default_city: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            geocoding_url: "https://geocoding-api.open-meteo.com/v1".to_string(),
            forecast_url: "https://api.open-meteo.com/v1".to_string(),
            timezone: "Asia/Seoul".to_string(),
            forecast_days: 7,
            default_city: "세종".to_string(),
            timeout_secs: 25,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// Any OpenAI-compatible server, e.g. `http://localhost:1234/v1` for LM Studio
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub system_prompt: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            system_prompt: Some("You are a helpful assistant.".to_string()),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// Sent to local OpenAI-compatible servers, which accept any key.
pub const LOCAL_SERVER_KEY: &str = "lm-studio";

impl ChatConfig {
    pub fn is_openai_cloud(&self) -> bool {
        self.base_url.contains("api.openai.com")
    }

    /// The configured key. The OpenAI cloud falls back to `OPENAI_API_KEY`;
    /// other servers fall back to [`LOCAL_SERVER_KEY`].
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(std::env::var("OPENAI_API_KEY").ok())
    }

    fn resolve_api_key_with(&self, env_key: Option<String>) -> Option<String> {
        let non_blank = |k: &String| !k.trim().is_empty();
        let configured = self.api_key.clone().filter(non_blank);
        if self.is_openai_cloud() {
            configured.or_else(|| env_key.filter(non_blank))
        } else {
            configured.or_else(|| Some(LOCAL_SERVER_KEY.to_string()))
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub rates: RatesConfig,
    pub weather: WeatherConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults when there is none.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxdash", "fxdash")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
