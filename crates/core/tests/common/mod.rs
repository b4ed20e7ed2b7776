// ═══════════════════════════════════════════════════════════════════
// Shared test helpers — scripted provider, loopback HTTP stub
// ═══════════════════════════════════════════════════════════════════
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crypto_dash_core::errors::CoreError;
use crypto_dash_core::models::asset::{AssetId, MarketCoin};
use crypto_dash_core::models::price::MarketChart;
use crypto_dash_core::providers::coingecko::CoinGeckoProvider;
use crypto_dash_core::providers::traits::MarketDataProvider;

pub const DAY_MS: i64 = 86_400_000;

pub fn id(s: &str) -> AssetId {
    AssetId::new(s).expect("valid asset id")
}

pub fn chart(prices: &[(f64, f64)]) -> MarketChart {
    MarketChart {
        prices: prices.to_vec(),
        market_caps: vec![],
        total_volumes: vec![],
    }
}

/// `n` daily samples starting at `start_ms`, price rising by `step`.
pub fn daily_chart(start_ms: i64, n: usize, first_price: f64, step: f64) -> MarketChart {
    let prices: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            (
                (start_ms + i as i64 * DAY_MS) as f64,
                first_price + i as f64 * step,
            )
        })
        .collect();
    chart(&prices)
}

pub fn coin(id: &str, symbol: &str, name: &str, price: Option<f64>, cap: Option<f64>, change: Option<f64>) -> MarketCoin {
    MarketCoin {
        id: id.to_string(),
        symbol: symbol.to_string(),
        name: name.to_string(),
        image: None,
        current_price: price,
        market_cap: cap,
        market_cap_rank: None,
        price_change_percentage_24h: change,
    }
}

// ═══════════════════════════════════════════════════════════════════
// Scripted provider
// ═══════════════════════════════════════════════════════════════════

/// Answers from a script keyed by asset id. Unknown ids fail like a 404.
/// A gated asset blocks until the test releases its semaphore.
#[derive(Default)]
pub struct ScriptedProvider {
    charts: Mutex<HashMap<String, Result<MarketChart, String>>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: Mutex<Vec<String>>,
    markets: Mutex<Vec<MarketCoin>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chart(self, asset: &str, chart: MarketChart) -> Self {
        self.charts.lock().unwrap().insert(asset.to_string(), Ok(chart));
        self
    }

    pub fn with_failure(self, asset: &str, message: &str) -> Self {
        self.charts
            .lock()
            .unwrap()
            .insert(asset.to_string(), Err(message.to_string()));
        self
    }

    pub fn with_markets(self, coins: Vec<MarketCoin>) -> Self {
        *self.markets.lock().unwrap() = coins;
        self
    }

    /// Block fetches for `asset` until permits are added to the returned gate.
    pub fn gate(&self, asset: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(asset.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls.lock().unwrap().len() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn get_market_chart(
        &self,
        asset: &AssetId,
        _vs_currency: &str,
        _days: u32,
    ) -> Result<MarketChart, CoreError> {
        self.calls.lock().unwrap().push(asset.to_string());

        let gate = self.gates.lock().unwrap().get(asset.as_str()).cloned();
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| CoreError::Fetch("gate closed".into()))?;
        }

        let scripted = self.charts.lock().unwrap().get(asset.as_str()).cloned();
        match scripted {
            Some(Ok(chart)) => Ok(chart),
            Some(Err(message)) => Err(CoreError::Fetch(message)),
            None => Err(CoreError::Fetch("HTTP 404 Not Found".into())),
        }
    }

    async fn get_markets(
        &self,
        _vs_currency: &str,
        per_page: usize,
    ) -> Result<Vec<MarketCoin>, CoreError> {
        let coins = self.markets.lock().unwrap().clone();
        Ok(coins.into_iter().take(per_page).collect())
    }
}

// ═══════════════════════════════════════════════════════════════════
// Loopback HTTP stub
// ═══════════════════════════════════════════════════════════════════

/// Answers every connection with the same canned response and records
/// the request lines it saw.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(status: &str, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let log = requests.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let log = log.clone();
                let response = response.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    loop {
                        let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        read += n;
                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") || read == buf.len() {
                            break;
                        }
                    }
                    let request = String::from_utf8_lossy(&buf[..read]).to_string();
                    if let Some(line) = request.lines().next() {
                        log.lock().unwrap().push(line.to_string());
                    }
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}/api/v3/coins"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// A provider pointed at this stub that ignores any proxy settings.
    pub fn provider(&self) -> CoinGeckoProvider {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        CoinGeckoProvider::with_client(client, self.base_url.clone())
    }
}
