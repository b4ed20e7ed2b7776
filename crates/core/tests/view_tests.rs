// ═══════════════════════════════════════════════════════════════════
// Price Chart View Tests — fetch cycle lifecycle, stale responses,
// unmount, rendering of each phase
// ═══════════════════════════════════════════════════════════════════

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{chart, daily_chart, id, ScriptedProvider, StubServer, DAY_MS};
use crypto_dash_core::errors::CoreError;
use crypto_dash_core::models::asset::{AssetId, MarketCoin};
use crypto_dash_core::models::load_state::{LoadState, ViewPhase};
use crypto_dash_core::models::price::MarketChart;
use crypto_dash_core::models::settings::Settings;
use crypto_dash_core::providers::traits::MarketDataProvider;
use crypto_dash_core::render::{self, svg::SvgRenderer};
use crypto_dash_core::view::{FetchCycle, PriceChartView, RenderOutput, LOADING_PLACEHOLDER};

fn view_with(provider: ScriptedProvider) -> (Arc<ScriptedProvider>, Arc<PriceChartView>) {
    let provider = Arc::new(provider);
    let view = Arc::new(PriceChartView::new(provider.clone(), &Settings::default()));
    (provider, view)
}

fn displayed_prices(view: &PriceChartView) -> Vec<f64> {
    match view.state() {
        LoadState::Loaded(series) => series.points().iter().map(|p| p.price).collect(),
        other => panic!("expected Loaded, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════
// Initial state
// ═══════════════════════════════════════════════════════════════════

mod initial_state {
    use super::*;

    #[test]
    fn new_view_is_idle_and_renders_nothing() {
        let (_, view) = view_with(ScriptedProvider::new());
        assert_eq!(view.phase(), ViewPhase::Idle);
        assert_eq!(view.render(), RenderOutput::Empty);
        assert!(!view.is_mounted());
        assert!(view.asset().is_none());
    }

    #[test]
    fn mount_enters_loading_before_fetch_resolves() {
        let (provider, view) = view_with(
            ScriptedProvider::new().with_chart("bitcoin", chart(&[(1.0, 2.0)])),
        );
        let cycle = view.mount(id("bitcoin"));

        assert_eq!(cycle.asset().as_str(), "bitcoin");
        assert_eq!(view.phase(), ViewPhase::Loading);
        assert_eq!(
            view.render(),
            RenderOutput::Placeholder(LOADING_PLACEHOLDER.to_string())
        );
        assert!(!matches!(view.render(), RenderOutput::Chart(_)));
        assert!(provider.calls().is_empty(), "no request until the cycle is driven");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Success path
// ═══════════════════════════════════════════════════════════════════

mod success {
    use super::*;

    #[tokio::test]
    async fn loaded_series_becomes_chart() {
        let (provider, view) = view_with(ScriptedProvider::new().with_chart(
            "bitcoin",
            chart(&[(1_700_000_000_000.0, 42_000.5), (1_700_086_400_000.0, 42_500.0)]),
        ));

        let cycle = view.mount(id("bitcoin"));
        assert!(view.run(cycle).await);

        assert_eq!(view.phase(), ViewPhase::Displaying);
        assert_eq!(provider.calls(), vec!["bitcoin"]);

        let RenderOutput::Chart(line) = view.render() else {
            panic!("expected a chart");
        };
        assert_eq!(line.data.datasets.len(), 1);
        let dataset = &line.data.datasets[0];
        assert_eq!(dataset.label, "Price (USD)");
        let xs: Vec<i64> = dataset.data.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = dataset.data.iter().map(|p| p.y).collect();
        assert_eq!(xs, vec![1_700_000_000_000, 1_700_086_400_000]);
        assert_eq!(ys, vec![42_000.5, 42_500.0]);
    }

    #[tokio::test]
    async fn load_mounts_and_runs() {
        let (provider, view) = view_with(
            ScriptedProvider::new().with_chart("bitcoin", daily_chart(0, 3, 1.0, 1.0)),
        );
        assert_eq!(view.load(id("bitcoin")).await, ViewPhase::Displaying);
        assert!(view.is_mounted());

        // Same identifier again: nothing to do.
        assert_eq!(view.load(id("bitcoin")).await, ViewPhase::Displaying);
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_prices_load_as_empty_series() {
        let (_, view) = view_with(ScriptedProvider::new().with_chart("bitcoin", chart(&[])));
        view.load(id("bitcoin")).await;

        assert_eq!(view.phase(), ViewPhase::Displaying);
        let RenderOutput::Chart(line) = view.render() else {
            panic!("expected a chart");
        };
        assert_eq!(line.data.point_count(), 0);
    }

    #[tokio::test]
    async fn seven_day_bitcoin_scenario() {
        let start = 1_700_000_000_000;
        let (_, view) = view_with(
            ScriptedProvider::new().with_chart("bitcoin", daily_chart(start, 7, 35_000.0, 500.0)),
        );
        view.load(id("bitcoin")).await;

        let output = view.render();
        let RenderOutput::Chart(line) = &output else {
            panic!("expected a chart");
        };
        assert_eq!(line.data.datasets.len(), 1);
        assert_eq!(line.data.datasets[0].data.len(), 7);
        let xs: Vec<i64> = line.data.datasets[0].data.iter().map(|p| p.x).collect();
        assert!(xs.windows(2).all(|w| w[1] - w[0] == DAY_MS));

        let x_ticks = line.x_ticks();
        assert!(!x_ticks.is_empty());
        assert!(x_ticks.len() <= 7);

        let y_labels = line.y_tick_labels();
        assert!(!y_labels.is_empty());
        assert!(y_labels.iter().all(|l| l.starts_with('$')), "{y_labels:?}");

        let svg = SvgRenderer::new(render::init()).render(&output).unwrap();
        assert!(svg.contains('$'));
        assert!(!svg.contains("<circle"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Failure path
// ═══════════════════════════════════════════════════════════════════

mod failure {
    use super::*;

    #[tokio::test]
    async fn provider_error_shows_message_and_skips_transform() {
        let (_, view) = view_with(
            ScriptedProvider::new().with_failure("bitcoin", "HTTP 500 Internal Server Error"),
        );
        view.load(id("bitcoin")).await;

        assert_eq!(view.phase(), ViewPhase::ErrorShown);
        assert_eq!(view.stats().transforms, 0);
        match view.render() {
            RenderOutput::Error(message) => {
                assert!(message.starts_with("Failed to fetch data"), "{message}");
                assert!(message.contains("500"));
            }
            other => panic!("expected error output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_success_status_over_http() {
        let server = StubServer::start("503 Service Unavailable", r#"{"error":"busy"}"#).await;
        let view = PriceChartView::new(Arc::new(server.provider()), &Settings::default());

        assert_eq!(view.load(id("bitcoin")).await, ViewPhase::ErrorShown);
        assert_eq!(view.stats().transforms, 0);
        assert!(view.state().error().unwrap().contains("503"));
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn body_without_prices_is_an_error_not_a_crash() {
        let server = StubServer::start("200 OK", r#"{"market_caps":[[1,2]]}"#).await;
        let view = PriceChartView::new(Arc::new(server.provider()), &Settings::default());

        assert_eq!(view.load(id("bitcoin")).await, ViewPhase::ErrorShown);
        let message = view.state().error().unwrap().to_string();
        assert!(message.starts_with("Failed to fetch data"), "{message}");
        assert!(message.contains("prices"), "{message}");
    }

    #[tokio::test]
    async fn body_that_is_not_json_is_an_error() {
        let server = StubServer::start("200 OK", "<html>oops</html>").await;
        let view = PriceChartView::new(Arc::new(server.provider()), &Settings::default());
        assert_eq!(view.load(id("bitcoin")).await, ViewPhase::ErrorShown);
    }

    #[tokio::test]
    async fn out_of_range_timestamp_is_an_error_not_a_crash() {
        let (_, view) = view_with(
            ScriptedProvider::new().with_chart("bitcoin", chart(&[(1.0e19, 1.0)])),
        );
        assert_eq!(view.load(id("bitcoin")).await, ViewPhase::ErrorShown);
        let message = view.state().error().unwrap().to_string();
        assert!(message.starts_with("Failed to fetch data"), "{message}");
        assert!(message.contains("timestamp"), "{message}");
        assert!(matches!(view.render(), RenderOutput::Error(_)));
    }

    #[tokio::test]
    async fn error_does_not_retry_until_identifier_changes() {
        let (provider, view) = view_with(
            ScriptedProvider::new()
                .with_failure("bitcoin", "HTTP 429 Too Many Requests")
                .with_chart("ethereum", daily_chart(0, 2, 1.0, 1.0)),
        );
        view.load(id("bitcoin")).await;
        assert!(view.set_asset(id("bitcoin")).is_none());
        assert_eq!(provider.calls(), vec!["bitcoin"]);

        let cycle = view.set_asset(id("ethereum")).unwrap();
        assert_eq!(view.phase(), ViewPhase::Loading);
        assert!(view.state().error().is_none(), "error cleared on re-entry");
        view.run(cycle).await;
        assert_eq!(view.phase(), ViewPhase::Displaying);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Identifier changes & stale responses
// ═══════════════════════════════════════════════════════════════════

mod identifier_change {
    use super::*;

    #[tokio::test]
    async fn change_fetches_once_and_replaces_series() {
        let (provider, view) = view_with(
            ScriptedProvider::new()
                .with_chart("bitcoin", chart(&[(1.0, 100.0), (2.0, 110.0)]))
                .with_chart("ethereum", chart(&[(1.0, 5.0)])),
        );
        view.load(id("bitcoin")).await;
        assert_eq!(displayed_prices(&view), vec![100.0, 110.0]);

        let cycle = view.set_asset(id("ethereum")).expect("new cycle");
        assert_eq!(view.phase(), ViewPhase::Loading);
        assert!(view.state().series().is_none(), "previous series cleared");

        assert!(view.run(cycle).await);
        assert_eq!(provider.calls(), vec!["bitcoin", "ethereum"]);
        assert_eq!(displayed_prices(&view), vec![5.0]);
        assert_eq!(view.asset(), Some(id("ethereum")));
    }

    #[tokio::test]
    async fn same_identifier_starts_no_cycle() {
        let (provider, view) = view_with(
            ScriptedProvider::new().with_chart("bitcoin", chart(&[(1.0, 1.0)])),
        );
        let cycle = view.mount(id("bitcoin"));
        view.run(cycle).await;

        assert!(view.set_asset(id("bitcoin")).is_none());
        assert_eq!(provider.calls().len(), 1);
        assert_eq!(view.stats().cycles_started, 1);
    }

    #[tokio::test]
    async fn late_response_for_old_identifier_is_ignored() {
        let provider = ScriptedProvider::new()
            .with_chart("bitcoin", chart(&[(1.0, 40_000.0)]))
            .with_chart("ethereum", chart(&[(1.0, 2_000.0)]));
        let bitcoin_gate = provider.gate("bitcoin");
        let (provider, view) = view_with(provider);

        let first = view.mount(id("bitcoin"));
        let task = {
            let view = view.clone();
            tokio::spawn(async move { view.run(first).await })
        };
        provider.wait_for_calls(1).await;

        let second = view.set_asset(id("ethereum")).expect("new cycle");
        assert!(view.run(second).await);
        assert_eq!(displayed_prices(&view), vec![2_000.0]);

        // Now let the bitcoin response through, after ethereum's.
        bitcoin_gate.add_permits(1);
        assert!(!task.await.unwrap());

        assert_eq!(displayed_prices(&view), vec![2_000.0]);
        assert_eq!(view.asset(), Some(id("ethereum")));
        let stats = view.stats();
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.discarded, 1);
    }

    #[tokio::test]
    async fn superseded_cycle_never_issues_its_request() {
        let (provider, view) = view_with(
            ScriptedProvider::new()
                .with_chart("bitcoin", chart(&[(1.0, 1.0)]))
                .with_chart("ethereum", chart(&[(1.0, 2.0)])),
        );
        let first = view.mount(id("bitcoin"));
        let second = view.set_asset(id("ethereum")).unwrap();
        assert!(second.generation() > first.generation());

        assert!(!view.run(first).await);
        assert!(view.run(second).await);

        assert_eq!(provider.calls(), vec!["ethereum"]);
        assert_eq!(displayed_prices(&view), vec![2.0]);
    }

    /// Switches the attached view to `next` while answering the first
    /// request, then completes that request normally.
    struct SwitchingProvider {
        next: AssetId,
        view: Mutex<Option<Arc<PriceChartView>>>,
        pending: Mutex<Option<FetchCycle>>,
        calls: Mutex<Vec<String>>,
    }

    impl SwitchingProvider {
        fn new(next: &str) -> Self {
            Self {
                next: id(next),
                view: Mutex::new(None),
                pending: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn attach(&self, view: Arc<PriceChartView>) {
            *self.view.lock().unwrap() = Some(view);
        }

        fn take_cycle(&self) -> Option<FetchCycle> {
            self.pending.lock().unwrap().take()
        }
    }

    #[async_trait]
    impl MarketDataProvider for SwitchingProvider {
        fn name(&self) -> &str {
            "Switching"
        }

        async fn get_market_chart(
            &self,
            asset: &AssetId,
            _vs_currency: &str,
            _days: u32,
        ) -> Result<MarketChart, CoreError> {
            self.calls.lock().unwrap().push(asset.to_string());
            let view = self.view.lock().unwrap().take();
            if let Some(view) = view {
                *self.pending.lock().unwrap() = view.set_asset(self.next.clone());
                return Ok(chart(&[(1.0, 40_000.0)]));
            }
            Ok(chart(&[(1.0, 2_000.0)]))
        }

        async fn get_markets(
            &self,
            _vs_currency: &str,
            _per_page: usize,
        ) -> Result<Vec<MarketCoin>, CoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn completion_racing_the_abort_is_discarded() {
        let provider = Arc::new(SwitchingProvider::new("ethereum"));
        let view = Arc::new(PriceChartView::new(provider.clone(), &Settings::default()));
        provider.attach(view.clone());

        let first = view.mount(id("bitcoin"));
        assert!(!view.run(first).await);

        // The bitcoin fetch resolved after its cycle was aborted.
        assert_eq!(view.phase(), ViewPhase::Loading);
        assert_eq!(view.asset(), Some(id("ethereum")));
        let stats = view.stats();
        assert_eq!(stats.transforms, 1);
        assert_eq!(stats.applied, 0);
        assert_eq!(stats.discarded, 1);

        let second = provider.take_cycle().expect("switch started a cycle");
        assert!(view.run(second).await);
        assert_eq!(displayed_prices(&view), vec![2_000.0]);
        assert_eq!(*provider.calls.lock().unwrap(), vec!["bitcoin", "ethereum"]);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Unmount
// ═══════════════════════════════════════════════════════════════════

mod unmount {
    use super::*;

    #[tokio::test]
    async fn in_flight_fetch_is_abandoned() {
        let provider = ScriptedProvider::new().with_chart("bitcoin", chart(&[(1.0, 1.0)]));
        let gate = provider.gate("bitcoin");
        let (provider, view) = view_with(provider);

        let cycle = view.mount(id("bitcoin"));
        let task = {
            let view = view.clone();
            tokio::spawn(async move { view.run(cycle).await })
        };
        provider.wait_for_calls(1).await;

        view.unmount();
        gate.add_permits(1);

        assert!(!task.await.unwrap());
        assert!(!view.is_mounted());
        assert_eq!(view.phase(), ViewPhase::Loading);
        assert_eq!(view.stats().applied, 0);
    }

    #[tokio::test]
    async fn identifier_change_after_unmount_is_ignored() {
        let (provider, view) = view_with(
            ScriptedProvider::new().with_chart("bitcoin", chart(&[(1.0, 1.0)])),
        );
        view.load(id("bitcoin")).await;
        view.unmount();

        assert!(view.set_asset(id("ethereum")).is_none());
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn remount_fetches_again() {
        let (provider, view) = view_with(
            ScriptedProvider::new().with_chart("bitcoin", chart(&[(1.0, 1.0)])),
        );
        view.load(id("bitcoin")).await;
        view.unmount();

        let cycle = view.mount(id("bitcoin"));
        assert!(view.run(cycle).await);
        assert_eq!(provider.calls().len(), 2);
        assert_eq!(view.phase(), ViewPhase::Displaying);
    }
}
