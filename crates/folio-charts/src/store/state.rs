//! Chart state and its transitions.
//!
//! Every transition is a pure `(state, event) -> state` function; the
//! [`ChartStore`](super::ChartStore) applies them and handles persistence.

use chrono::NaiveDate;
use folio_core::FinancialData;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::extract::{ChartDataPoint, combine, metric_series};
use crate::metrics::{
    ChartMetric, MarginKind, MetricFamily, MetricSeries, PRICE_METRIC, ReturnKind, ValuationKind,
    margin_metrics, return_metrics,
};

/// Years shown when nothing is persisted.
pub const DEFAULT_YEARS: u32 = 10;

/// Everything the chart shows and the user has selected.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartState {
    /// Whether the chart panel is shown.
    pub show_chart: bool,
    /// Series in chart order: raw, margins, returns, valuations, price.
    pub selected_metrics: Vec<ChartMetric>,
    /// Raw, valuation and price selections in the order the user made them.
    pub selected_metric_names: Vec<String>,
    /// Number of years shown.
    pub selected_years: u32,
    /// Enabled margins.
    pub margins: BTreeSet<MarginKind>,
    /// Enabled return ratios.
    pub return_metrics: BTreeSet<ReturnKind>,
    /// Enabled valuation ratios.
    pub valuation_metrics: BTreeSet<ValuationKind>,
    /// Snapshot the statement-derived series were computed from.
    pub last_financial_data: Option<Arc<FinancialData>>,
    /// Per-series visibility; a missing entry means visible.
    pub metric_visibility: BTreeMap<String, bool>,
}

impl Default for ChartState {
    fn default() -> Self {
        Self {
            show_chart: false,
            selected_metrics: Vec::new(),
            selected_metric_names: Vec::new(),
            selected_years: DEFAULT_YEARS,
            margins: BTreeSet::new(),
            return_metrics: BTreeSet::new(),
            valuation_metrics: BTreeSet::new(),
            last_financial_data: None,
            metric_visibility: BTreeMap::new(),
        }
    }
}

impl ChartState {
    /// Returns the selected series with this name.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&ChartMetric> {
        self.selected_metrics.iter().find(|m| m.name == name)
    }

    /// Returns true if any selected series has a point.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.selected_metrics.iter().any(ChartMetric::has_data)
    }

    /// Returns true if the series is visible.
    #[must_use]
    pub fn is_visible(&self, name: &str) -> bool {
        self.metric_visibility.get(name).copied().unwrap_or(true)
    }

    fn family(&self, family: MetricFamily) -> Vec<ChartMetric> {
        self.selected_metrics
            .iter()
            .filter(|m| MetricFamily::of(&m.name) == family)
            .cloned()
            .collect()
    }

    fn remove_metric(&mut self, name: &str) {
        self.selected_metrics.retain(|m| m.name != name);
        self.selected_metric_names.retain(|n| n != name);
        self.metric_visibility.remove(name);
    }

    /// Rebuilds the series list in chart order, replacing one family.
    fn splice(&mut self, family: MetricFamily, replacement: Vec<ChartMetric>) {
        let order = [
            MetricFamily::Raw,
            MetricFamily::Margin,
            MetricFamily::Return,
            MetricFamily::Valuation,
            MetricFamily::Price,
        ];
        let mut replacement = Some(replacement);
        let metrics: Vec<ChartMetric> = order
            .into_iter()
            .flat_map(|f| {
                if f == family {
                    replacement.take().unwrap_or_default()
                } else {
                    self.family(f)
                }
            })
            .collect();
        self.selected_metrics = metrics;
        self.show_chart = self.has_data();
    }
}

/// A transition of the chart state.
#[derive(Clone, Debug, PartialEq)]
pub enum ChartEvent {
    /// Recompute raw, margin and return series from a new snapshot.
    UpdateMetrics(Arc<FinancialData>),
    /// Select a series, or deselect it if already selected or `values` is empty.
    MetricClick {
        /// Series name.
        name: String,
        /// Values, aligned with `dates`.
        values: Vec<f64>,
        /// Dates, aligned with `values`.
        dates: Vec<NaiveDate>,
    },
    /// Show or hide a raw, valuation or price series.
    ToggleMetricVisibility(String),
    /// Enable or disable a margin.
    ToggleMargin(MarginKind),
    /// Enable or disable a return ratio.
    ToggleReturn(ReturnKind),
    /// Flip a valuation flag and its name in the selection.
    ToggleValuation(ValuationKind),
    /// Change the number of years shown.
    SetSelectedYears(u32),
    /// Install the price series, or remove it when empty.
    SetPriceSeries(Vec<ChartDataPoint>),
    /// Reset the selection.
    Clear,
}

impl ChartEvent {
    /// A click that deselects `name`.
    #[must_use]
    pub fn deselect(name: impl Into<String>) -> Self {
        Self::MetricClick {
            name: name.into(),
            values: Vec::new(),
            dates: Vec::new(),
        }
    }

    /// A click carrying a calculator result.
    #[must_use]
    pub fn select(name: impl Into<String>, series: MetricSeries) -> Self {
        Self::MetricClick {
            name: name.into(),
            values: series.values,
            dates: series.dates,
        }
    }
}

/// Applies one event, returning the next state.
#[must_use]
pub fn reduce(state: &ChartState, event: ChartEvent) -> ChartState {
    let mut next = state.clone();
    match event {
        ChartEvent::UpdateMetrics(data) => update_metrics(&mut next, data),
        ChartEvent::MetricClick { name, values, dates } => metric_click(&mut next, name, values, dates),
        ChartEvent::ToggleMetricVisibility(name) => toggle_visibility(&mut next, &name),
        ChartEvent::ToggleMargin(kind) => {
            let Some(data) = next.last_financial_data.clone() else {
                return next;
            };
            toggle(&mut next.margins, kind);
            let margins = margin_metrics(&data, &next.margins);
            next.splice(MetricFamily::Margin, margins);
        }
        ChartEvent::ToggleReturn(kind) => {
            let Some(data) = next.last_financial_data.clone() else {
                return next;
            };
            toggle(&mut next.return_metrics, kind);
            let returns = return_metrics(&data, &next.return_metrics);
            next.splice(MetricFamily::Return, returns);
        }
        ChartEvent::ToggleValuation(kind) => {
            let name = kind.name();
            if toggle(&mut next.valuation_metrics, kind) {
                if !next.selected_metric_names.iter().any(|n| n == name) {
                    next.selected_metric_names.push(name.to_string());
                }
            } else {
                next.selected_metric_names.retain(|n| n != name);
                next.selected_metrics.retain(|m| m.name != name);
            }
        }
        ChartEvent::SetSelectedYears(years) => next.selected_years = years,
        ChartEvent::SetPriceSeries(points) => set_price_series(&mut next, points),
        ChartEvent::Clear => {
            next = ChartState {
                selected_years: state.selected_years,
                ..ChartState::default()
            };
        }
    }
    next
}

/// Flips membership, returning true if the kind is now enabled.
fn toggle<K: Ord>(set: &mut BTreeSet<K>, kind: K) -> bool {
    if set.remove(&kind) {
        false
    } else {
        set.insert(kind);
        true
    }
}

fn update_metrics(state: &mut ChartState, data: Arc<FinancialData>) {
    let raw: Vec<ChartMetric> = state
        .selected_metric_names
        .iter()
        .filter(|name| MetricFamily::of(name) == MetricFamily::Raw)
        .map(|name| ChartMetric {
            name: name.clone(),
            data: metric_series(&data, name),
            hidden: !state.is_visible(name),
        })
        .collect();

    let mut metrics = raw;
    metrics.extend(margin_metrics(&data, &state.margins));
    metrics.extend(return_metrics(&data, &state.return_metrics));
    metrics.extend(state.family(MetricFamily::Valuation));
    metrics.extend(state.family(MetricFamily::Price));

    state.selected_metrics = metrics;
    state.show_chart = state.has_data();
    state.last_financial_data = Some(data);
}

fn metric_click(state: &mut ChartState, name: String, values: Vec<f64>, dates: Vec<NaiveDate>) {
    let selected = state.selected_metric_names.contains(&name);
    if selected || values.is_empty() || dates.is_empty() {
        state.remove_metric(&name);
        state.show_chart = !state.selected_metrics.is_empty();
        return;
    }

    let points = combine([MetricSeries { values, dates }.points()]);
    let metric = ChartMetric::new(name.clone(), points);
    // Re-selecting a series that was only displayed replaces it.
    state.selected_metrics.retain(|m| m.name != name);
    state.selected_metrics.push(metric);
    state.metric_visibility.insert(name.clone(), true);
    state.selected_metric_names.push(name);
    state.show_chart = true;
}

fn toggle_visibility(state: &mut ChartState, name: &str) {
    if MetricFamily::of(name).is_percentage() {
        return;
    }
    let visible = !state.is_visible(name);
    state.metric_visibility.insert(name.to_string(), visible);
    for metric in state.selected_metrics.iter_mut().filter(|m| m.name == name) {
        metric.hidden = !visible;
    }
}

fn set_price_series(state: &mut ChartState, points: Vec<ChartDataPoint>) {
    if points.is_empty() {
        state.remove_metric(PRICE_METRIC);
        state.show_chart = state.has_data();
        return;
    }

    let hidden = !state.is_visible(PRICE_METRIC);
    let price = ChartMetric {
        name: PRICE_METRIC.to_string(),
        data: combine([points]),
        hidden,
    };
    if !state.selected_metric_names.iter().any(|n| n == PRICE_METRIC) {
        state.selected_metric_names.push(PRICE_METRIC.to_string());
    }
    state.splice(MetricFamily::Price, vec![price]);
}
