//! Crypto Dash CLI
//!
//! Renders cryptocurrency price charts and the markets overview from the
//! terminal. Settings come from the environment (`COIN_API_URL`, ...), with
//! `.env` honoured.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crypto_dash_core::models::asset::{AssetId, MarketCoin};
use crypto_dash_core::models::chart::{currency_prefix, format_grouped, LineChart};
use crypto_dash_core::models::settings::Settings;
use crypto_dash_core::render::{self, svg::SvgRenderer, ChartRegistry};
use crypto_dash_core::services::market_service::{MarketQuery, MarketSort};
use crypto_dash_core::view::{PriceChartView, RenderOutput};
use crypto_dash_core::CryptoDash;

#[derive(Parser)]
#[command(name = "crypto-dash", version, about = "Cryptocurrency price charts and market overview")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one asset's recent price history and show it as a chart
    Chart {
        /// Asset identifier, e.g. "bitcoin"
        asset: String,
        /// Write the chart as SVG to this file
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the chart description as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the top coins by market cap
    Markets {
        /// Case-insensitive match on name or symbol
        #[arg(long)]
        filter: Option<String>,
        /// market_cap_desc, market_cap_asc, price_desc, price_asc, change_desc, change_asc
        #[arg(long, default_value = "market_cap_desc")]
        sort: MarketSort,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Point one chart view at several assets in turn; the last one wins
    Watch {
        #[arg(required = true)]
        assets: Vec<String>,
        /// Pause between identifier changes
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crypto_dash=info,crypto_dash_core=info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_env().context("resolving settings")?;
    let registry = render::init();
    let dash = CryptoDash::new(settings)?;
    tracing::info!(
        provider = dash.provider_name(),
        base_url = %dash.settings().api_base_url,
        "crypto-dash starting"
    );

    match cli.command {
        Command::Chart { asset, out, json } => run_chart(&dash, registry, &asset, out, json).await,
        Command::Markets { filter, sort, limit } => {
            run_markets(&dash, MarketQuery { filter, sort, limit }).await
        }
        Command::Watch {
            assets,
            interval_ms,
            out,
        } => run_watch(&dash, registry, &assets, interval_ms, out).await,
    }
}

async fn run_chart(
    dash: &CryptoDash,
    registry: &ChartRegistry,
    asset: &str,
    out: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let asset: AssetId = asset.parse()?;
    let view = dash.chart_view();
    view.load(asset.clone()).await;
    present(dash, registry, &view, &asset, out.as_deref(), json)
}

async fn run_watch(
    dash: &CryptoDash,
    registry: &ChartRegistry,
    assets: &[String],
    interval_ms: u64,
    out: Option<PathBuf>,
) -> Result<()> {
    let ids = assets
        .iter()
        .map(|a| a.parse::<AssetId>())
        .collect::<Result<Vec<_>, _>>()?;

    let view = Arc::new(dash.chart_view());
    let mut tasks = Vec::new();
    for (i, asset) in ids.iter().enumerate() {
        let cycle = if i == 0 {
            Some(view.mount(asset.clone()))
        } else {
            view.set_asset(asset.clone())
        };
        if let Some(cycle) = cycle {
            let view = view.clone();
            tasks.push(tokio::spawn(async move { view.run(cycle).await }));
        }
        if interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    }
    for task in tasks {
        task.await?;
    }

    let stats = view.stats();
    tracing::info!(
        started = stats.cycles_started,
        applied = stats.applied,
        discarded = stats.discarded,
        "watch finished"
    );
    let Some(last) = view.asset() else {
        bail!("no asset was mounted");
    };
    present(dash, registry, &view, &last, out.as_deref(), false)
}

fn present(
    dash: &CryptoDash,
    registry: &ChartRegistry,
    view: &PriceChartView,
    asset: &AssetId,
    out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let output = view.render();

    if let Some(path) = out {
        let title = format!("{asset} - last {} days", dash.settings().days);
        let svg = SvgRenderer::new(registry).with_title(title).render(&output)?;
        std::fs::write(path, svg).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "chart written");
    }

    match output {
        RenderOutput::Chart(chart) if json => {
            println!("{}", serde_json::to_string_pretty(&chart)?);
        }
        RenderOutput::Chart(chart) => print_summary(asset, &chart),
        RenderOutput::Error(message) => bail!("{asset}: {message}"),
        RenderOutput::Placeholder(text) => println!("{text}"),
        RenderOutput::Empty => {}
    }
    Ok(())
}

fn print_summary(asset: &AssetId, chart: &LineChart) {
    let y_axis = &chart.options.y_axis;
    for dataset in &chart.data.datasets {
        println!("{asset}: {} ({} points)", dataset.label, dataset.data.len());
        if let (Some(first), Some(last)) = (dataset.data.first(), dataset.data.last()) {
            let change = if first.y != 0.0 {
                (last.y - first.y) / first.y * 100.0
            } else {
                0.0
            };
            println!(
                "  {} -> {} ({change:+.2}%)",
                y_axis.format_tick(first.y),
                y_axis.format_tick(last.y)
            );
        }
    }
    println!("  x: {}", chart.x_tick_labels().join(" | "));
    println!("  y: {}", chart.y_tick_labels().join(" | "));
}

async fn run_markets(dash: &CryptoDash, query: MarketQuery) -> Result<()> {
    let coins = dash.top_coins(&query).await?;
    if coins.is_empty() {
        println!("No coins match.");
        return Ok(());
    }
    let prefix = currency_prefix(&dash.settings().vs_currency);
    println!("{:>4}  {:<8} {:<24} {:>16} {:>9} {:>22}", "#", "SYMBOL", "NAME", "PRICE", "24H", "MARKET CAP");
    for coin in &coins {
        print_coin(coin, &prefix);
    }
    Ok(())
}

fn print_coin(coin: &MarketCoin, prefix: &str) {
    let money = |v: Option<f64>| {
        v.map(|v| format!("{prefix}{}", format_grouped(v)))
            .unwrap_or_else(|| "-".to_string())
    };
    let rank = coin
        .market_cap_rank
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    let change = coin
        .price_change_percentage_24h
        .map(|c| format!("{c:+.2}%"))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:>4}  {:<8} {:<24} {:>16} {:>9} {:>22}",
        rank,
        coin.symbol.to_uppercase(),
        coin.name,
        money(coin.current_price),
        change,
        money(coin.market_cap)
    );
}
