use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// One plotted sample: x is a Unix timestamp in milliseconds, y the price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub x: i64,
    pub y: f64,
}

/// A labelled line over a set of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<ChartPoint>,
    /// Fill the area under the curve.
    pub fill: bool,
    pub border_color: String,
    pub background_color: String,
    /// 0 hides the point markers.
    pub point_radius: u32,
    /// Bezier smoothing, 0 draws straight segments.
    pub tension: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<i64>,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    pub fn point_count(&self) -> usize {
        self.datasets.iter().map(|d| d.data.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Hour,
    Day,
}

impl TimeUnit {
    pub fn millis(&self) -> i64 {
        match self {
            TimeUnit::Hour => MILLIS_PER_DAY / 24,
            TimeUnit::Day => MILLIS_PER_DAY,
        }
    }
}

/// Upper bound on the ticks a single time axis produces.
pub const MAX_TIME_TICKS: usize = 10_000;

/// Horizontal time axis: ticks on unit boundaries, thinned to a cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAxis {
    pub unit: TimeUnit,
    pub auto_skip: bool,
    pub max_ticks_limit: usize,
}

impl TimeAxis {
    pub fn daily(max_ticks_limit: usize) -> Self {
        Self {
            unit: TimeUnit::Day,
            auto_skip: true,
            max_ticks_limit,
        }
    }

    /// Tick positions for data spanning `min..=max` (milliseconds).
    ///
    /// Candidates start at the unit boundary at or before `min` and step one
    /// unit until past `max`. With auto-skip on, every n-th candidate is kept
    /// so that at most `max_ticks_limit` remain. Without it the result is
    /// capped at `MAX_TIME_TICKS`.
    pub fn ticks(&self, min: i64, max: i64) -> Vec<i64> {
        if min > max {
            return Vec::new();
        }
        // i128 so that flooring and stepping near the i64 edges cannot overflow.
        let step = i128::from(self.unit.millis());
        let first = i128::from(min).div_euclid(step) * step;
        let candidates = (i128::from(max) - first) / step + 1;

        let limit = self.max_ticks_limit.max(1) as i128;
        let stride = if self.auto_skip && candidates > limit {
            (candidates + limit - 1) / limit
        } else {
            1
        };
        let kept = (candidates + stride - 1) / stride;
        (0..kept)
            .take(MAX_TIME_TICKS)
            .filter_map(|k| i64::try_from(first + k * stride * step).ok())
            .collect()
    }

    /// Tick label, e.g. "Nov 14" for daily ticks.
    pub fn format_tick(&self, ms: i64) -> String {
        let Some(dt) = DateTime::<Utc>::from_timestamp_millis(ms) else {
            return ms.to_string();
        };
        match self.unit {
            TimeUnit::Hour => dt.format("%b %d %H:%M").to_string(),
            TimeUnit::Day => dt.format("%b %d").to_string(),
        }
    }
}

/// Vertical value axis with currency-formatted labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyAxis {
    pub prefix: String,
    pub target_ticks: usize,
}

impl CurrencyAxis {
    pub fn for_currency(vs_currency: &str) -> Self {
        Self {
            prefix: currency_prefix(vs_currency),
            target_ticks: 6,
        }
    }

    pub fn format_tick(&self, value: f64) -> String {
        format!("{}{}", self.prefix, format_grouped(value))
    }

    /// "Nice" tick values (1, 2 or 5 times a power of ten) covering `min..=max`.
    pub fn ticks(&self, min: f64, max: f64) -> Vec<f64> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Vec::new();
        }
        if min == max {
            return vec![min];
        }
        let step = nice_step((max - min) / self.target_ticks.max(1) as f64);
        let start = (min / step).floor() * step;
        if !step.is_finite() || step <= 0.0 || !start.is_finite() {
            return Vec::new();
        }
        // A nice step is never smaller than the raw one, so the span needs at
        // most `target_ticks + 2` positions.
        let max_ticks = self.target_ticks.max(1) + 2;
        (0..=max_ticks)
            .map(|i| start + i as f64 * step)
            .take_while(|value| *value <= max + step * 1e-9)
            .filter(|value| *value >= min - step * 1e-9)
            .collect()
    }
}

fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TooltipMode {
    /// One tooltip listing every dataset at the hovered x position.
    Index,
    Nearest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipOptions {
    pub mode: TooltipMode,
    pub intersect: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub responsive: bool,
    pub show_legend: bool,
    pub fill_propagate: bool,
    pub tooltip: TooltipOptions,
    pub x_axis: TimeAxis,
    pub y_axis: CurrencyAxis,
}

/// Everything a frontend needs to draw the price chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineChart {
    pub data: ChartData,
    pub options: ChartOptions,
}

impl LineChart {
    /// x tick positions after auto-skip.
    pub fn x_ticks(&self) -> Vec<i64> {
        match self.x_bounds() {
            Some((min, max)) => self.options.x_axis.ticks(min, max),
            None => Vec::new(),
        }
    }

    pub fn x_tick_labels(&self) -> Vec<String> {
        self.x_ticks()
            .into_iter()
            .map(|t| self.options.x_axis.format_tick(t))
            .collect()
    }

    pub fn y_ticks(&self) -> Vec<f64> {
        match self.y_bounds() {
            Some((min, max)) => self.options.y_axis.ticks(min, max),
            None => Vec::new(),
        }
    }

    pub fn y_tick_labels(&self) -> Vec<String> {
        self.y_ticks()
            .into_iter()
            .map(|v| self.options.y_axis.format_tick(v))
            .collect()
    }

    pub fn x_bounds(&self) -> Option<(i64, i64)> {
        let xs = self.data.datasets.iter().flat_map(|d| d.data.iter().map(|p| p.x));
        let (mut min, mut max) = (i64::MAX, i64::MIN);
        let mut any = false;
        for x in xs {
            min = min.min(x);
            max = max.max(x);
            any = true;
        }
        any.then_some((min, max))
    }

    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        self.data
            .datasets
            .iter()
            .flat_map(|d| d.data.iter().map(|p| p.y))
            .filter(|y| y.is_finite())
            .fold(None, |acc, y| match acc {
                None => Some((y, y)),
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
            })
    }
}

/// Label prefix for a quote currency code.
pub fn currency_prefix(vs_currency: &str) -> String {
    match vs_currency.to_ascii_lowercase().as_str() {
        "usd" => "$".to_string(),
        "eur" => "€".to_string(),
        "gbp" => "£".to_string(),
        "jpy" => "¥".to_string(),
        other => format!("{} ", other.to_ascii_uppercase()),
    }
}

/// en-US style number: grouped thousands, at most three fraction digits,
/// trailing zeros dropped ("42,000.5").
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = (value * 1000.0).round() / 1000.0;
    let formatted = format!("{:.3}", rounded.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (formatted.as_str(), ""),
    };

    let mut out = String::with_capacity(formatted.len() + int_part.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// `format_grouped` with a `$` prefix, the USD axis label format.
pub fn format_usd(value: f64) -> String {
    format!("${}", format_grouped(value))
}
