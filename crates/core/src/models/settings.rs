use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

pub const DEFAULT_API_BASE_URL: &str = "https://api.coingecko.com/api/v3/coins";

pub const ENV_API_URL: &str = "COIN_API_URL";
pub const ENV_VS_CURRENCY: &str = "COIN_VS_CURRENCY";
pub const ENV_CHART_DAYS: &str = "COIN_CHART_DAYS";
pub const ENV_TIMEOUT_SECS: &str = "COIN_API_TIMEOUT_SECS";
pub const ENV_MAX_TICKS: &str = "COIN_CHART_MAX_TICKS";

/// Application settings, resolved once at startup and handed to the
/// provider and views. Nothing in the library reads the environment on its
/// own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the market-data API, up to and including `/coins`.
    pub api_base_url: String,

    /// Quote currency for prices (e.g., "usd").
    pub vs_currency: String,

    /// Length of the price window in days.
    pub days: u32,

    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,

    /// Maximum number of x-axis tick labels.
    pub max_x_ticks: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            vs_currency: "usd".to_string(),
            days: 7,
            request_timeout_secs: 30,
            max_x_ticks: 7,
        }
    }
}

impl Settings {
    /// Defaults overridden by `COIN_*` environment variables.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `COIN_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            settings.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(currency) = lookup(ENV_VS_CURRENCY) {
            settings.vs_currency = currency.trim().to_ascii_lowercase();
        }
        if let Some(days) = lookup(ENV_CHART_DAYS) {
            settings.days = parse_var(ENV_CHART_DAYS, &days)?;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            settings.request_timeout_secs = parse_var(ENV_TIMEOUT_SECS, &secs)?;
        }
        if let Some(ticks) = lookup(ENV_MAX_TICKS) {
            settings.max_x_ticks = parse_var(ENV_MAX_TICKS, &ticks)?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(CoreError::Config(format!(
                "{ENV_API_URL} must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }
        if self.vs_currency.is_empty() || !self.vs_currency.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::Config(format!(
                "{ENV_VS_CURRENCY} must be a currency code, got {:?}",
                self.vs_currency
            )));
        }
        if self.days == 0 {
            return Err(CoreError::Config(format!("{ENV_CHART_DAYS} must be at least 1")));
        }
        if self.max_x_ticks == 0 {
            return Err(CoreError::Config(format!("{ENV_MAX_TICKS} must be at least 1")));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, CoreError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| CoreError::Config(format!("{key}={raw:?}: {e}")))
}
