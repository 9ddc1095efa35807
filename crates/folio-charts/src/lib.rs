#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Chart configuration: axes, datasets, colors and formatting.
pub mod config;
/// Per-field time series extraction.
pub mod extract;
/// Display label to statement field resolution.
pub mod fields;
/// Period view filtering and TTM synthesis.
pub mod filter;
/// Margin, return and valuation calculators.
pub mod metrics;
/// Chart state, reducers and persistence.
pub mod store;

pub use config::{ChartConfig, ChartOptions, Dataset, ThemeMode, build_chart_config};
pub use extract::{ChartDataPoint, combine, extract, extract_segment, metric_series};
pub use fields::resolve;
pub use filter::{filter_financial_data, filter_statements, synthesize_ttm};
pub use metrics::{
    ChartMetric, MarginKind, MetricFamily, MetricSeries, PRICE_METRIC, ReturnKind, ValuationKind,
    calculate_margin, calculate_return, calculate_valuation,
};
pub use store::{ChartEvent, ChartState, ChartStore, FinancialView, reduce};
