use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::asset::{AssetId, MarketCoin};
use crate::models::price::MarketChart;

/// Abstraction over the market-data API.
///
/// The chart view and market service only see this trait, so tests swap in
/// scripted providers and another API can be plugged in without touching
/// the lifecycle code.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Price history of `asset` over the last `days` days, quoted in `vs_currency`.
    ///
    /// Every failure (transport, status, body) is a `CoreError::Fetch`.
    async fn get_market_chart(
        &self,
        asset: &AssetId,
        vs_currency: &str,
        days: u32,
    ) -> Result<MarketChart, CoreError>;

    /// Top coins by market cap, at most `per_page` of them.
    async fn get_markets(
        &self,
        vs_currency: &str,
        per_page: usize,
    ) -> Result<Vec<MarketCoin>, CoreError>;
}
