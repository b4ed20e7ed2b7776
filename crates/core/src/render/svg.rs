use chrono::{DateTime, Utc};
use plotters::prelude::*;

use super::ChartRegistry;
use crate::errors::CoreError;
use crate::models::chart::LineChart;
use crate::view::RenderOutput;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 400;
pub const NO_DATA_MESSAGE: &str = "No price data";

const LINE_COLOR: RGBColor = RGBColor(0, 123, 255);
const FILL_OPACITY: f64 = 0.1;

/// Draws chart descriptions as standalone SVG documents.
pub struct SvgRenderer<'a> {
    registry: &'a ChartRegistry,
    width: u32,
    height: u32,
    title: Option<String>,
}

impl<'a> SvgRenderer<'a> {
    pub fn new(registry: &'a ChartRegistry) -> Self {
        Self {
            registry,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            title: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Placeholder and error outputs become a single line of text.
    pub fn render(&self, output: &RenderOutput) -> Result<String, CoreError> {
        match output {
            RenderOutput::Empty => self.render_message(""),
            RenderOutput::Placeholder(text) => self.render_message(text),
            RenderOutput::Error(message) => self.render_message(message),
            RenderOutput::Chart(chart) => self.render_chart(chart),
        }
    }

    pub fn render_chart(&self, chart: &LineChart) -> Result<String, CoreError> {
        self.registry.ensure_supports(chart)?;

        let (Some((x_min, x_max)), Some((y_min, y_max))) = (chart.x_bounds(), chart.y_bounds())
        else {
            return self.render_message(NO_DATA_MESSAGE);
        };
        let x_max = if x_max == x_min {
            x_min.saturating_add(chart.options.x_axis.unit.millis())
        } else {
            x_max
        };
        let (Some(t_min), Some(t_max)) = (to_instant(x_min), to_instant(x_max)) else {
            return self.render_message(NO_DATA_MESSAGE);
        };
        let pad = ((y_max - y_min) * 0.1).max(y_max.abs() * 0.01).max(1e-8);
        let (y_lo, y_hi) = (y_min - pad, y_max + pad);
        if !(y_hi - y_lo).is_finite() {
            return Err(CoreError::Render(format!(
                "price range {y_min}..{y_max} is too wide to plot"
            )));
        }

        let x_axis = &chart.options.x_axis;
        let y_axis = &chart.options.y_axis;

        let mut buf = String::new();
        {
            let root = SVGBackend::with_string(&mut buf, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let mut builder = ChartBuilder::on(&root);
            builder.margin(15).x_label_area_size(40).y_label_area_size(90);
            if let Some(title) = &self.title {
                builder.caption(title, ("sans-serif", 24.0).into_font());
            }
            let mut ctx = builder
                .build_cartesian_2d(t_min..t_max, y_lo..y_hi)
                .map_err(render_err)?;

            ctx.configure_mesh()
                .x_labels(x_axis.max_ticks_limit.max(1))
                .y_labels(y_axis.target_ticks.max(1))
                .x_label_formatter(&|t: &DateTime<Utc>| x_axis.format_tick(t.timestamp_millis()))
                .y_label_formatter(&|v: &f64| y_axis.format_tick(*v))
                .draw()
                .map_err(render_err)?;

            for dataset in &chart.data.datasets {
                let points: Vec<(DateTime<Utc>, f64)> = dataset
                    .data
                    .iter()
                    .filter_map(|p| Some((to_instant(p.x)?, p.y)))
                    .collect();
                // point_radius 0 means no markers, so only the line (and fill) is drawn.
                if dataset.fill {
                    ctx.draw_series(
                        AreaSeries::new(points, y_lo, LINE_COLOR.mix(FILL_OPACITY).filled())
                            .border_style(LINE_COLOR.stroke_width(2)),
                    )
                    .map_err(render_err)?;
                } else {
                    ctx.draw_series(LineSeries::new(points, LINE_COLOR.stroke_width(2)))
                        .map_err(render_err)?;
                }
            }

            root.present().map_err(render_err)?;
        }
        Ok(buf)
    }

    fn render_message(&self, message: &str) -> Result<String, CoreError> {
        let mut buf = String::new();
        {
            let root = SVGBackend::with_string(&mut buf, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;
            if !message.is_empty() {
                let style = ("sans-serif", 20.0).into_font().color(&BLACK);
                root.draw_text(message, &style, (20, self.height as i32 / 2))
                    .map_err(render_err)?;
            }
            root.present().map_err(render_err)?;
        }
        Ok(buf)
    }
}

fn to_instant(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

fn render_err<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Render(e.to_string())
}
