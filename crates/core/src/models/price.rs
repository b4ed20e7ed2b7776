use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::CoreError;

/// Raw `[timestampMillis, value]` sample as sent by the provider.
pub type RawSample = (f64, f64);

/// A single price data point (instant → price).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix timestamp in milliseconds, taken verbatim from the provider.
    pub timestamp_ms: i64,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp_ms: i64, price: f64) -> Self {
        Self { timestamp_ms, price }
    }

    /// The sample instant, or `None` when the timestamp is out of chrono's range.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}

/// Provider response for `/{id}/market_chart`.
///
/// `prices` is mandatory: a body without it is a malformed payload and
/// fails deserialization instead of producing an empty chart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketChart {
    pub prices: Vec<RawSample>,
    #[serde(default)]
    pub market_caps: Vec<RawSample>,
    #[serde(default)]
    pub total_volumes: Vec<RawSample>,
}

/// Ordered, immutable sequence of price points.
///
/// Order is whatever the provider sent; nothing here sorts. Clones share
/// the same allocation, and a refetch builds a new series rather than
/// touching an existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Arc<[PricePoint]>,
}

impl PriceSeries {
    pub fn from_points(points: Vec<PricePoint>) -> Self {
        Self {
            points: points.into(),
        }
    }

    /// Map each raw `[ms, price]` sample to a `PricePoint`, keeping order.
    ///
    /// A timestamp that is not a whole number of milliseconds inside chrono's
    /// date range, or a non-finite price, rejects the whole payload.
    pub fn from_market_chart(chart: &MarketChart) -> Result<Self, CoreError> {
        chart
            .prices
            .iter()
            .enumerate()
            .map(|(i, &(ms, price))| sample_to_point(i, ms, price))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_points)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Smallest and largest timestamp, regardless of order.
    pub fn time_bounds(&self) -> Option<(i64, i64)> {
        let min = self.points.iter().map(|p| p.timestamp_ms).min()?;
        let max = self.points.iter().map(|p| p.timestamp_ms).max()?;
        Some((min, max))
    }

    /// Smallest and largest finite price.
    pub fn price_bounds(&self) -> Option<(f64, f64)> {
        self.points
            .iter()
            .map(|p| p.price)
            .filter(|p| p.is_finite())
            .fold(None, |acc, p| match acc {
                None => Some((p, p)),
                Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
            })
    }
}

fn sample_to_point(index: usize, ms: f64, price: f64) -> Result<PricePoint, CoreError> {
    // `as` saturates; the round-trip comparison catches out-of-range values.
    let timestamp_ms = ms as i64;
    if !ms.is_finite()
        || ms.fract() != 0.0
        || timestamp_ms as f64 != ms
        || DateTime::<Utc>::from_timestamp_millis(timestamp_ms).is_none()
    {
        return Err(CoreError::Fetch(format!(
            "malformed payload: invalid timestamp {ms} at prices[{index}]"
        )));
    }
    if !price.is_finite() {
        return Err(CoreError::Fetch(format!(
            "malformed payload: invalid price {price} at prices[{index}]"
        )));
    }
    Ok(PricePoint::new(timestamp_ms, price))
}

impl From<Vec<PricePoint>> for PriceSeries {
    fn from(points: Vec<PricePoint>) -> Self {
        Self::from_points(points)
    }
}
