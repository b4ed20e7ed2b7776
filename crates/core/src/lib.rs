pub mod errors;
pub mod models;
pub mod providers;
pub mod render;
pub mod services;
pub mod view;

use std::sync::Arc;

use errors::CoreError;
use models::{asset::MarketCoin, settings::Settings};
use providers::{coingecko::CoinGeckoProvider, traits::MarketDataProvider};
use services::{
    chart_service::ChartService,
    market_service::{MarketQuery, MarketService},
};
use view::PriceChartView;

/// Main entry point for the Crypto Dash core library.
///
/// Holds the resolved settings and the shared provider, and hands out
/// chart views and the markets overview wired to them.
#[must_use]
pub struct CryptoDash {
    settings: Settings,
    provider: Arc<dyn MarketDataProvider>,
    market_service: MarketService,
    chart_service: ChartService,
}

impl std::fmt::Debug for CryptoDash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoDash")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl CryptoDash {
    /// Validate `settings` and wire up the CoinGecko provider.
    pub fn new(settings: Settings) -> Result<Self, CoreError> {
        settings.validate()?;
        let provider = Arc::new(CoinGeckoProvider::from_settings(&settings));
        Ok(Self::with_provider(settings, provider))
    }

    /// Use a custom provider (alternative API, or a scripted one in tests).
    pub fn with_provider(settings: Settings, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            market_service: MarketService::new(provider.clone(), settings.vs_currency.clone()),
            chart_service: ChartService::from_settings(&settings),
            provider,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    #[must_use]
    pub fn chart_service(&self) -> &ChartService {
        &self.chart_service
    }

    /// A fresh, unmounted price chart view sharing this dashboard's provider.
    pub fn chart_view(&self) -> PriceChartView {
        PriceChartView::new(self.provider.clone(), &self.settings)
    }

    /// Markets overview: top coins, filtered and sorted per `query`.
    pub async fn top_coins(&self, query: &MarketQuery) -> Result<Vec<MarketCoin>, CoreError> {
        self.market_service.top_coins(query).await
    }
}
