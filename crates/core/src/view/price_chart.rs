use futures::future::{AbortHandle, AbortRegistration, Abortable, Aborted};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::CoreError;
use crate::models::asset::AssetId;
use crate::models::chart::LineChart;
use crate::models::load_state::{LoadState, ViewPhase};
use crate::models::price::PriceSeries;
use crate::models::settings::Settings;
use crate::providers::traits::MarketDataProvider;
use crate::services::chart_service::ChartService;

/// Text shown while a fetch cycle is outstanding.
pub const LOADING_PLACEHOLDER: &str = "Loading Chart...";

/// What a view shows right now.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutput {
    /// Not mounted yet.
    Empty,
    Placeholder(String),
    Error(String),
    Chart(LineChart),
}

/// Counters over the view's lifetime, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub cycles_started: u64,
    pub fetches_issued: u64,
    pub transforms: u64,
    pub applied: u64,
    pub discarded: u64,
}

/// One fetch cycle: a generation number bound to an identifier, plus the
/// registration that lets a newer cycle abort this one's request.
pub struct FetchCycle {
    generation: u64,
    asset: AssetId,
    registration: AbortRegistration,
}

impl FetchCycle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }
}

impl fmt::Debug for FetchCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCycle")
            .field("generation", &self.generation)
            .field("asset", &self.asset)
            .finish()
    }
}

#[derive(Default)]
struct Inner {
    mounted: bool,
    generation: u64,
    asset: Option<AssetId>,
    state: LoadState,
    abort: Option<AbortHandle>,
    stats: CycleStats,
}

/// Price chart for one asset at a time.
///
/// State machine: `Idle → Loading → {Displaying, ErrorShown}`, back to
/// `Loading` whenever the identifier changes. Each transition into
/// `Loading` opens a new generation and aborts the previous request, and an
/// outcome is applied only if its generation is still the current one. A
/// superseded or unmounted cycle can therefore never overwrite newer state.
///
/// The view does not spawn anything: `mount`/`set_asset` hand back a
/// [`FetchCycle`] and the host drives it with [`PriceChartView::run`] on
/// whatever executor it uses.
pub struct PriceChartView {
    provider: Arc<dyn MarketDataProvider>,
    chart_service: ChartService,
    vs_currency: String,
    days: u32,
    inner: Mutex<Inner>,
}

impl PriceChartView {
    pub fn new(provider: Arc<dyn MarketDataProvider>, settings: &Settings) -> Self {
        Self {
            provider,
            chart_service: ChartService::from_settings(settings),
            vs_currency: settings.vs_currency.clone(),
            days: settings.days,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Mount the view for `asset` and start its first cycle.
    pub fn mount(&self, asset: AssetId) -> FetchCycle {
        let mut inner = self.lock();
        inner.mounted = true;
        Self::begin(&mut inner, asset)
    }

    /// Switch to another identifier. Returns `None` when unmounted or when
    /// `asset` is already the current identifier: no new fetch in that case.
    pub fn set_asset(&self, asset: AssetId) -> Option<FetchCycle> {
        let mut inner = self.lock();
        if !inner.mounted {
            tracing::debug!(%asset, "ignoring identifier change on unmounted view");
            return None;
        }
        if inner.asset.as_ref() == Some(&asset) {
            return None;
        }
        Some(Self::begin(&mut inner, asset))
    }

    /// Abandon the current cycle. Its request is aborted and any late
    /// completion is discarded.
    pub fn unmount(&self) {
        let mut inner = self.lock();
        if let Some(handle) = inner.abort.take() {
            handle.abort();
        }
        inner.mounted = false;
        inner.generation += 1;
        tracing::debug!(generation = inner.generation, "price chart unmounted");
    }

    fn begin(inner: &mut Inner, asset: AssetId) -> FetchCycle {
        if let Some(handle) = inner.abort.take() {
            handle.abort();
        }
        let (handle, registration) = AbortHandle::new_pair();
        inner.generation += 1;
        inner.abort = Some(handle);
        inner.asset = Some(asset.clone());
        inner.state = LoadState::Loading;
        inner.stats.cycles_started += 1;
        tracing::debug!(%asset, generation = inner.generation, "fetch cycle started");

        FetchCycle {
            generation: inner.generation,
            asset,
            registration,
        }
    }

    fn is_current(inner: &Inner, generation: u64) -> bool {
        inner.mounted && inner.generation == generation
    }

    // ── Fetch cycle ─────────────────────────────────────────────────

    /// Drive `cycle` to completion: one request, the transform on success,
    /// then apply the outcome if the cycle is still current.
    ///
    /// Returns `true` when the outcome was applied, `false` when the cycle
    /// was superseded, unmounted or aborted. Never returns an error: failures
    /// become `LoadState::Failed`.
    pub async fn run(&self, cycle: FetchCycle) -> bool {
        let FetchCycle {
            generation,
            asset,
            registration,
        } = cycle;

        {
            let mut inner = self.lock();
            if !Self::is_current(&inner, generation) {
                inner.stats.discarded += 1;
                tracing::debug!(%asset, generation, "cycle superseded before fetch");
                return false;
            }
            inner.stats.fetches_issued += 1;
        }

        let fetch = self
            .provider
            .get_market_chart(&asset, &self.vs_currency, self.days);
        let result = match Abortable::new(fetch, registration).await {
            Ok(result) => result,
            Err(Aborted) => {
                self.lock().stats.discarded += 1;
                tracing::debug!(%asset, generation, "fetch aborted");
                return false;
            }
        };

        let outcome = match result {
            Ok(chart) => {
                self.lock().stats.transforms += 1;
                PriceSeries::from_market_chart(&chart)
            }
            Err(e) => Err(e),
        };
        self.apply(generation, &asset, outcome)
    }

    fn apply(
        &self,
        generation: u64,
        asset: &AssetId,
        outcome: Result<PriceSeries, CoreError>,
    ) -> bool {
        let mut inner = self.lock();
        if !Self::is_current(&inner, generation) {
            inner.stats.discarded += 1;
            tracing::debug!(%asset, generation, current = inner.generation, "discarding stale response");
            return false;
        }

        inner.abort = None;
        inner.state = match outcome {
            Ok(series) => {
                tracing::debug!(%asset, points = series.len(), "price series loaded");
                LoadState::Loaded(series)
            }
            Err(e) => {
                tracing::error!(%asset, error = %e, "price chart fetch failed");
                LoadState::Failed(e.to_string())
            }
        };
        inner.stats.applied += 1;
        true
    }

    /// Mount (if needed) or switch to `asset`, then drive the cycle.
    /// Returns the phase afterwards.
    pub async fn load(&self, asset: AssetId) -> ViewPhase {
        let cycle = {
            let mut inner = self.lock();
            if !inner.mounted {
                inner.mounted = true;
                Some(Self::begin(&mut inner, asset))
            } else if inner.asset.as_ref() != Some(&asset) {
                Some(Self::begin(&mut inner, asset))
            } else {
                None
            }
        };
        if let Some(cycle) = cycle {
            self.run(cycle).await;
        }
        self.phase()
    }

    // ── Observation ─────────────────────────────────────────────────

    pub fn state(&self) -> LoadState {
        self.lock().state.clone()
    }

    pub fn phase(&self) -> ViewPhase {
        self.lock().state.phase()
    }

    pub fn asset(&self) -> Option<AssetId> {
        self.lock().asset.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.lock().mounted
    }

    pub fn stats(&self) -> CycleStats {
        self.lock().stats
    }

    pub fn chart_service(&self) -> &ChartService {
        &self.chart_service
    }

    /// Current output: placeholder while loading, the captured message on
    /// failure, the line chart once loaded.
    pub fn render(&self) -> RenderOutput {
        match self.state() {
            LoadState::NotStarted => RenderOutput::Empty,
            LoadState::Loading => RenderOutput::Placeholder(LOADING_PLACEHOLDER.to_string()),
            LoadState::Loaded(series) => {
                RenderOutput::Chart(self.chart_service.build_line_chart(&series))
            }
            LoadState::Failed(message) => RenderOutput::Error(message),
        }
    }
}
