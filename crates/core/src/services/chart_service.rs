use crate::models::chart::{
    ChartData, ChartOptions, ChartPoint, CurrencyAxis, Dataset, LineChart, TimeAxis,
    TooltipMode, TooltipOptions,
};
use crate::models::price::PriceSeries;
use crate::models::settings::Settings;

const BORDER_COLOR: &str = "#007bff";
const BACKGROUND_COLOR: &str = "rgba(0, 123, 255, 0.1)";
const LINE_TENSION: f64 = 0.3;

/// Turns a price series into a chart-ready description.
///
/// The core computes the dataset and axis policy; a frontend (or the SVG
/// renderer) only draws it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartService {
    vs_currency: String,
    max_x_ticks: usize,
}

impl ChartService {
    pub fn new(vs_currency: impl Into<String>, max_x_ticks: usize) -> Self {
        Self {
            vs_currency: vs_currency.into(),
            max_x_ticks,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.vs_currency.clone(), settings.max_x_ticks)
    }

    /// "Price (USD)" for the default quote currency.
    pub fn dataset_label(&self) -> String {
        format!("Price ({})", self.vs_currency.to_ascii_uppercase())
    }

    /// One dataset, one point per sample, in series order.
    pub fn to_chart_data(&self, series: &PriceSeries) -> ChartData {
        let data: Vec<ChartPoint> = series
            .points()
            .iter()
            .map(|p| ChartPoint {
                x: p.timestamp_ms,
                y: p.price,
            })
            .collect();

        ChartData {
            labels: data.iter().map(|p| p.x).collect(),
            datasets: vec![Dataset {
                label: self.dataset_label(),
                data,
                fill: true,
                border_color: BORDER_COLOR.to_string(),
                background_color: BACKGROUND_COLOR.to_string(),
                point_radius: 0,
                tension: LINE_TENSION,
            }],
        }
    }

    pub fn options(&self) -> ChartOptions {
        ChartOptions {
            responsive: true,
            show_legend: false,
            fill_propagate: true,
            tooltip: TooltipOptions {
                mode: TooltipMode::Index,
                intersect: false,
            },
            x_axis: TimeAxis::daily(self.max_x_ticks),
            y_axis: CurrencyAxis::for_currency(&self.vs_currency),
        }
    }

    pub fn build_line_chart(&self, series: &PriceSeries) -> LineChart {
        LineChart {
            data: self.to_chart_data(series),
            options: self.options(),
        }
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
