//! Axis auto-ranging.

use serde::{Deserialize, Serialize};

/// Fraction of the data range added above and below.
pub const PADDING_RATIO: f64 = 0.15;

/// Lowest value of the percentage axis.
pub const PERCENT_FLOOR: f64 = -50.0;

/// Highest value of the percentage axis.
pub const PERCENT_CEILING: f64 = 100.0;

/// Rounding step of the percentage axis bounds.
pub const PERCENT_STEP: f64 = 5.0;

/// Which scale a dataset is plotted against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisId {
    /// Absolute magnitudes, left side.
    Y,
    /// Percentages, right side.
    Y1,
    /// Prices, right side.
    Price,
}

/// Inclusive axis bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl AxisRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// A renderer axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Axis identifier referenced by datasets.
    pub id: AxisId,
    /// Whether the axis is drawn at all.
    pub display: bool,
    /// Whether grid lines are drawn.
    pub grid: bool,
    /// Bounds.
    #[serde(flatten)]
    pub range: AxisRange,
}

fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Padding for a data extent. A flat series is padded by its own magnitude.
fn padding(min: f64, max: f64) -> f64 {
    let range = max - min;
    if range > 0.0 {
        range * PADDING_RATIO
    } else {
        (max.abs() * PADDING_RATIO).max(1.0)
    }
}

/// Range of the percentage axis: padded, clamped to `[-50, 100]`, then
/// rounded outward to multiples of 5. Defaults to `[-50, 100]` without data.
#[must_use]
pub fn percentage_range(values: impl IntoIterator<Item = f64>) -> AxisRange {
    let Some((lo, hi)) = extent(values) else {
        return AxisRange::new(PERCENT_FLOOR, PERCENT_CEILING);
    };
    let pad = padding(lo, hi);
    let clamp = |v: f64| v.clamp(PERCENT_FLOOR, PERCENT_CEILING);
    let min = (clamp(lo - pad) / PERCENT_STEP).floor() * PERCENT_STEP;
    let mut max = (clamp(hi + pad) / PERCENT_STEP).ceil() * PERCENT_STEP;
    if max <= min {
        max = min + PERCENT_STEP;
    }
    AxisRange::new(min, max)
}

/// Range of the price axis: padded, never below zero. Defaults to `[0, 100]`.
#[must_use]
pub fn price_range(values: impl IntoIterator<Item = f64>) -> AxisRange {
    let Some((lo, hi)) = extent(values) else {
        return AxisRange::new(0.0, 100.0);
    };
    let pad = padding(lo, hi);
    AxisRange::new((lo - pad).max(0.0), hi + pad)
}

/// Range of the absolute axis: starts at zero for non-negative data,
/// otherwise padded below. Defaults to `[0, 100]`.
#[must_use]
pub fn absolute_range(values: impl IntoIterator<Item = f64>) -> AxisRange {
    let Some((lo, hi)) = extent(values) else {
        return AxisRange::new(0.0, 100.0);
    };
    let pad = padding(lo, hi);
    let min = if lo >= 0.0 { 0.0 } else { lo - pad };
    AxisRange::new(min, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentage_defaults() {
        assert_eq!(percentage_range([]), AxisRange::new(-50.0, 100.0));
        assert_eq!(percentage_range([f64::NAN]), AxisRange::new(-50.0, 100.0));
    }

    #[test]
    fn test_percentage_pads_and_rounds_to_five() {
        // range 20, pad 3 -> [7, 33] -> [5, 35]
        assert_eq!(percentage_range([10.0, 30.0, 20.0]), AxisRange::new(5.0, 35.0));
    }

    #[test]
    fn test_percentage_is_clamped() {
        assert_eq!(percentage_range([-200.0, 400.0]), AxisRange::new(-50.0, 100.0));
        let flat = percentage_range([150.0]);
        assert!(flat.max > flat.min);
    }

    #[test]
    fn test_flat_series_is_padded() {
        // pad = max(10 * 0.15, 1) = 1.5 -> [8.5, 11.5] -> [5, 15]
        assert_eq!(percentage_range([10.0, 10.0]), AxisRange::new(5.0, 15.0));
    }

    #[test]
    fn test_price_never_negative() {
        let range = price_range([1.0, 101.0]);
        assert_relative_eq!(range.min, 0.0);
        assert_relative_eq!(range.max, 116.0);
        assert_eq!(price_range([]), AxisRange::new(0.0, 100.0));
    }

    #[test]
    fn test_absolute_starts_at_zero_for_positive_data() {
        let range = absolute_range([200.0, 400.0]);
        assert_relative_eq!(range.min, 0.0);
        assert_relative_eq!(range.max, 430.0);

        let negative = absolute_range([-100.0, 100.0]);
        assert_relative_eq!(negative.min, -130.0);
    }
}
