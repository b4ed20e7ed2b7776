use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::asset::MarketCoin;
use crate::providers::traits::MarketDataProvider;

/// Provider page size cap for `/markets`.
pub const MAX_MARKETS_PER_PAGE: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSort {
    #[default]
    MarketCapDesc,
    MarketCapAsc,
    PriceDesc,
    PriceAsc,
    ChangeDesc,
    ChangeAsc,
}

impl MarketSort {
    pub const ALL: [MarketSort; 6] = [
        MarketSort::MarketCapDesc,
        MarketSort::MarketCapAsc,
        MarketSort::PriceDesc,
        MarketSort::PriceAsc,
        MarketSort::ChangeDesc,
        MarketSort::ChangeAsc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSort::MarketCapDesc => "market_cap_desc",
            MarketSort::MarketCapAsc => "market_cap_asc",
            MarketSort::PriceDesc => "price_desc",
            MarketSort::PriceAsc => "price_asc",
            MarketSort::ChangeDesc => "change_desc",
            MarketSort::ChangeAsc => "change_asc",
        }
    }

    fn key(&self, coin: &MarketCoin) -> Option<f64> {
        match self {
            MarketSort::MarketCapDesc | MarketSort::MarketCapAsc => coin.market_cap,
            MarketSort::PriceDesc | MarketSort::PriceAsc => coin.current_price,
            MarketSort::ChangeDesc | MarketSort::ChangeAsc => coin.price_change_percentage_24h,
        }
    }

    fn descending(&self) -> bool {
        matches!(
            self,
            MarketSort::MarketCapDesc | MarketSort::PriceDesc | MarketSort::ChangeDesc
        )
    }
}

impl fmt::Display for MarketSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketSort {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        MarketSort::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| CoreError::Config(format!("unknown sort key: {s}")))
    }
}

/// What the markets overview should show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuery {
    /// Case-insensitive substring matched against name and symbol.
    pub filter: Option<String>,
    pub sort: MarketSort,
    pub limit: usize,
}

impl Default for MarketQuery {
    fn default() -> Self {
        Self {
            filter: None,
            sort: MarketSort::default(),
            limit: 10,
        }
    }
}

/// Markets overview: top coins by market cap, filtered and sorted locally.
pub struct MarketService {
    provider: Arc<dyn MarketDataProvider>,
    vs_currency: String,
}

impl MarketService {
    pub fn new(provider: Arc<dyn MarketDataProvider>, vs_currency: impl Into<String>) -> Self {
        Self {
            provider,
            vs_currency: vs_currency.into(),
        }
    }

    /// Fetch `limit` coins, then apply the query's filter and sort.
    pub async fn top_coins(&self, query: &MarketQuery) -> Result<Vec<MarketCoin>, CoreError> {
        let per_page = query.limit.clamp(1, MAX_MARKETS_PER_PAGE);
        let coins = self.provider.get_markets(&self.vs_currency, per_page).await?;
        tracing::debug!(fetched = coins.len(), sort = %query.sort, "markets loaded");

        let mut coins = filter_coins(coins, query.filter.as_deref());
        sort_coins(&mut coins, query.sort);
        Ok(coins)
    }
}

/// Keep coins whose name or symbol contains `needle` (case-insensitive).
/// A missing or blank needle keeps everything.
pub fn filter_coins(coins: Vec<MarketCoin>, needle: Option<&str>) -> Vec<MarketCoin> {
    let needle = match needle.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_lowercase(),
        _ => return coins,
    };
    coins
        .into_iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&needle) || c.symbol.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Stable sort by the chosen key; coins without a value go last either way.
pub fn sort_coins(coins: &mut [MarketCoin], sort: MarketSort) {
    coins.sort_by(|a, b| match (sort.key(a), sort.key(b)) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if sort.descending() {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
