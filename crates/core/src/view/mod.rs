pub mod price_chart;

pub use price_chart::{CycleStats, FetchCycle, PriceChartView, RenderOutput, LOADING_PLACEHOLDER};
