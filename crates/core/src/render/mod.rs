pub mod svg;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use crate::errors::CoreError;
use crate::models::chart::LineChart;

/// Building blocks a chart description can rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChartComponent {
    CategoryScale,
    LinearScale,
    TimeScale,
    PointElement,
    LineElement,
    Tooltip,
    Legend,
    Filler,
}

impl ChartComponent {
    pub const ALL: [ChartComponent; 8] = [
        ChartComponent::CategoryScale,
        ChartComponent::LinearScale,
        ChartComponent::TimeScale,
        ChartComponent::PointElement,
        ChartComponent::LineElement,
        ChartComponent::Tooltip,
        ChartComponent::Legend,
        ChartComponent::Filler,
    ];
}

impl fmt::Display for ChartComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Set of registered chart components.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChartRegistry {
    components: BTreeSet<ChartComponent>,
}

impl ChartRegistry {
    pub fn with_components(components: impl IntoIterator<Item = ChartComponent>) -> Self {
        Self {
            components: components.into_iter().collect(),
        }
    }

    pub fn contains(&self, component: ChartComponent) -> bool {
        self.components.contains(&component)
    }

    pub fn components(&self) -> impl Iterator<Item = ChartComponent> + '_ {
        self.components.iter().copied()
    }

    /// Components a given chart needs in order to be drawn as described.
    pub fn required_by(chart: &LineChart) -> BTreeSet<ChartComponent> {
        let mut needed = BTreeSet::from([
            ChartComponent::TimeScale,
            ChartComponent::LinearScale,
            ChartComponent::LineElement,
            ChartComponent::PointElement,
        ]);
        if chart.data.datasets.iter().any(|d| d.fill) {
            needed.insert(ChartComponent::Filler);
        }
        if chart.options.show_legend {
            needed.insert(ChartComponent::Legend);
        }
        needed.insert(ChartComponent::Tooltip);
        needed
    }

    pub fn ensure_supports(&self, chart: &LineChart) -> Result<(), CoreError> {
        let missing: Vec<String> = Self::required_by(chart)
            .into_iter()
            .filter(|c| !self.contains(*c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::NotRegistered(missing.join(", ")))
        }
    }
}

static REGISTRY: OnceLock<ChartRegistry> = OnceLock::new();

/// Register every chart component for the process. Call once at startup;
/// later calls return the same registry.
pub fn init() -> &'static ChartRegistry {
    REGISTRY.get_or_init(|| {
        let registry = ChartRegistry::with_components(ChartComponent::ALL);
        tracing::info!(components = registry.components.len(), "chart components registered");
        registry
    })
}

/// The process-wide registry, if `init` has run.
pub fn registry() -> Result<&'static ChartRegistry, CoreError> {
    REGISTRY
        .get()
        .ok_or_else(|| CoreError::NotRegistered("chart components (render::init was not called)".into()))
}
