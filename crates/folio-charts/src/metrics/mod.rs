//! Ratio calculators.
//!
//! Every calculator returns a [`MetricSeries`] sorted ascending by date, or
//! signals [`FolioError::NoDataAvailable`](folio_core::FolioError) when a
//! required input is empty. Valuation calculators additionally signal
//! `NoValidDataAvailable` when every candidate point fails its bounds.

use chrono::NaiveDate;
use folio_core::{FiscalPeriod, Statement};
use serde::{Deserialize, Serialize};

use crate::extract::ChartDataPoint;

mod margins;
mod returns;
mod valuation;

pub use margins::{MarginKind, calculate_margin, margin_metrics};
pub use returns::{ReturnKind, calculate_return, return_metrics};
pub use valuation::{ValuationKind, calculate_valuation, shares_outstanding};

/// Parallel value and date arrays produced by a calculator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    /// Values, aligned with `dates`.
    pub values: Vec<f64>,
    /// Dates, ascending.
    pub dates: Vec<NaiveDate>,
}

impl MetricSeries {
    /// Builds a series from points, sorting them ascending by date.
    #[must_use]
    pub fn from_points(mut points: Vec<ChartDataPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let (dates, values) = points.into_iter().map(|p| (p.date, p.value)).unzip();
        Self { values, dates }
    }

    /// Zips the arrays back into points. Extra entries in the longer array
    /// are ignored.
    #[must_use]
    pub fn points(&self) -> Vec<ChartDataPoint> {
        self.dates
            .iter()
            .zip(&self.values)
            .map(|(date, value)| ChartDataPoint::new(*date, *value))
            .collect()
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len().min(self.dates.len())
    }

    /// Returns true if the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A selected chart series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartMetric {
    /// Display name, unique within the chart.
    pub name: String,
    /// Points sorted ascending by date, at most one per date.
    pub data: Vec<ChartDataPoint>,
    /// Whether the renderer should hide the series.
    #[serde(default)]
    pub hidden: bool,
}

impl ChartMetric {
    /// Creates a visible metric.
    #[must_use]
    pub fn new(name: impl Into<String>, data: Vec<ChartDataPoint>) -> Self {
        Self {
            name: name.into(),
            data,
            hidden: false,
        }
    }

    /// Creates a visible metric from a calculator result.
    #[must_use]
    pub fn from_series(name: impl Into<String>, series: &MetricSeries) -> Self {
        Self::new(name, series.points())
    }

    /// Returns true if the metric has at least one point.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Name of the price pseudo-metric, sourced from the price feed.
pub const PRICE_METRIC: &str = "Stock Price";

/// Which calculator family produced a chart series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    /// A statement line item or segment selected by label.
    Raw,
    /// A margin, or any label containing "Margin".
    Margin,
    /// ROIC, ROCE, ROE or ROA.
    Return,
    /// A price-based valuation ratio.
    Valuation,
    /// The price pseudo-metric.
    Price,
}

impl MetricFamily {
    /// Classifies a series by name.
    #[must_use]
    pub fn of(name: &str) -> Self {
        if name == PRICE_METRIC {
            Self::Price
        } else if ValuationKind::from_name(name).is_some() {
            Self::Valuation
        } else if ReturnKind::from_name(name).is_some() {
            Self::Return
        } else if name.contains("Margin") {
            Self::Margin
        } else {
            Self::Raw
        }
    }

    /// Returns true for families plotted as percentages.
    #[must_use]
    pub const fn is_percentage(&self) -> bool {
        matches!(self, Self::Margin | Self::Return)
    }
}

/// Multiplier that annualizes a single quarter's flow. FY and TTM figures
/// already span a year.
#[must_use]
pub const fn annualization_factor(period: FiscalPeriod) -> f64 {
    if period.is_full_year() { 1.0 } else { 4.0 }
}

/// Exact-date temporal join.
///
/// Returns the statement in `candidates` with the same date as `date`,
/// preferring one with the same period tag. Statements whose fiscal period
/// ends on a different day are not matched, even one day apart.
#[must_use]
pub fn join_exact<S: Statement>(
    date: NaiveDate,
    period: FiscalPeriod,
    candidates: &[S],
) -> Option<&S> {
    let mut same_date = candidates.iter().filter(|c| c.date() == date);
    let first = same_date.next()?;
    if first.period() == period {
        return Some(first);
    }
    same_date.find(|c| c.period() == period).or(Some(first))
}

/// Backward-looking temporal join.
///
/// `sorted_desc` must be sorted newest first. Returns the most recent entry
/// dated on or before `date`; never an entry after it. There is no staleness
/// limit.
#[must_use]
pub fn as_of<T>(sorted_desc: &[T], date: NaiveDate, date_of: impl Fn(&T) -> NaiveDate) -> Option<&T> {
    let idx = sorted_desc.partition_point(|item| date_of(item) > date);
    sorted_desc.get(idx)
}
