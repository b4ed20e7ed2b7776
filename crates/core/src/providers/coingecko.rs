use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use super::traits::MarketDataProvider;
use crate::errors::CoreError;
use crate::models::asset::{AssetId, MarketCoin};
use crate::models::price::MarketChart;
use crate::models::settings::{Settings, DEFAULT_API_BASE_URL};

/// CoinGecko-compatible `/coins` API provider.
///
/// - **Free**: no API key required for the public endpoints used here.
/// - **Endpoints**: `/{id}/market_chart`, `/markets`
///
/// Any non-2xx status, transport failure, or body that does not match the
/// expected shape surfaces as the same `CoreError::Fetch`.
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, 30)
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_timeout(settings.api_base_url.clone(), settings.request_timeout_secs)
    }

    #[cfg_attr(target_arch = "wasm32", allow(unused_variables))]
    fn with_timeout(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(timeout_secs));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Use a preconfigured client (custom proxy, TLS or timeout settings).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn market_chart_url(&self, asset: &AssetId, vs_currency: &str, days: u32) -> String {
        format!(
            "{}/{asset}/market_chart?vs_currency={vs_currency}&days={days}",
            self.base_url
        )
    }

    pub fn markets_url(&self, vs_currency: &str, per_page: usize) -> String {
        format!(
            "{}/markets?vs_currency={vs_currency}&order=market_cap_desc&per_page={per_page}&page=1&sparkline=false",
            self.base_url
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CoreError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(provider = self.name(), %status, "non-success response");
            return Err(CoreError::Fetch(format!("HTTP {status}")));
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

/// Parse a `/market_chart` body. A missing or mistyped `prices` field is a
/// fetch failure, never a panic further down.
pub fn parse_market_chart(body: &str) -> Result<MarketChart, CoreError> {
    Ok(serde_json::from_str(body)?)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MarketDataProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    async fn get_market_chart(
        &self,
        asset: &AssetId,
        vs_currency: &str,
        days: u32,
    ) -> Result<MarketChart, CoreError> {
        let url = self.market_chart_url(asset, vs_currency, days);
        tracing::debug!(%asset, vs_currency, days, "requesting market chart");
        self.get_json(&url).await
    }

    async fn get_markets(
        &self,
        vs_currency: &str,
        per_page: usize,
    ) -> Result<Vec<MarketCoin>, CoreError> {
        let url = self.markets_url(vs_currency, per_page);
        tracing::debug!(vs_currency, per_page, "requesting markets");
        self.get_json(&url).await
    }
}
