//! Per-field time series extraction.

use chrono::NaiveDate;
use folio_core::{FinancialData, SegmentReport, Statement};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::fields::resolve;

/// One dated value of a chart series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    /// Statement or price date.
    pub date: NaiveDate,
    /// Value at that date.
    pub value: f64,
}

impl ChartDataPoint {
    /// Creates a point.
    #[must_use]
    pub const fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

fn sorted(mut points: Vec<ChartDataPoint>) -> Vec<ChartDataPoint> {
    // Stable, so same-date points keep their input order.
    points.sort_by_key(|p| p.date);
    points
}

/// Extracts a field's finite values, sorted ascending by date.
#[must_use]
pub fn extract<S: Statement>(statements: &[S], field: &str) -> Vec<ChartDataPoint> {
    sorted(
        statements
            .iter()
            .filter_map(|s| s.finite(field).map(|v| ChartDataPoint::new(s.date(), v)))
            .collect(),
    )
}

/// Extracts one segment or region's finite values, sorted ascending by date.
#[must_use]
pub fn extract_segment(segments: &[SegmentReport], name: &str) -> Vec<ChartDataPoint> {
    sorted(
        segments
            .iter()
            .filter_map(|s| s.value(name).map(|v| ChartDataPoint::new(s.date, v)))
            .collect(),
    )
}

/// Concatenates series, keeps the first point seen for each date, and sorts
/// ascending. Callers order inputs by priority.
#[must_use]
pub fn combine<I>(series: I) -> Vec<ChartDataPoint>
where
    I: IntoIterator<Item = Vec<ChartDataPoint>>,
{
    let mut seen = HashSet::new();
    sorted(series.into_iter().flatten().filter(|p| seen.insert(p.date)).collect())
}

/// Builds the series for a raw metric label.
///
/// The label is resolved to a field key and read from income statements,
/// balance sheets and cash flow statements in that priority order. The label
/// itself is then looked up as a product segment and as a region.
#[must_use]
pub fn metric_series(data: &FinancialData, display_name: &str) -> Vec<ChartDataPoint> {
    let field = resolve(display_name);
    combine([
        extract(&data.income_statements, &field),
        extract(&data.balance_sheets, &field),
        extract(&data.cash_flow_statements, &field),
        extract_segment(&data.revenue_segments, display_name),
        extract_segment(&data.revenue_geo_segments, display_name),
    ])
}
