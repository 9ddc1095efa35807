//! Chart metric store.
//!
//! [`ChartStore`] owns the current [`ChartState`], applies [`ChartEvent`]s
//! through [`reduce`], persists the selection to a [`KeyValueStorage`], and
//! publishes every committed state to subscribers.

use folio_core::{FinancialData, KeyValueStorage, Result, StockPrice};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::extract::ChartDataPoint;
use crate::metrics::{MarginKind, ReturnKind, ValuationKind, calculate_valuation};

mod persist;
mod state;
mod view;

pub use state::{ChartEvent, ChartState, DEFAULT_YEARS, reduce};
pub use view::FinancialView;

use persist::Writes;

/// Chart state holder backed by durable client storage.
#[derive(Debug)]
pub struct ChartStore<S> {
    storage: S,
    state: watch::Sender<ChartState>,
}

impl<S: KeyValueStorage> ChartStore<S> {
    /// Creates a store, loading the persisted selection.
    pub fn new(storage: S) -> Self {
        let initial = persist::load(&storage);
        debug!(
            metrics = initial.selected_metric_names.len(),
            years = initial.selected_years,
            "Loaded chart selection"
        );
        let (state, _) = watch::channel(initial);
        Self { storage, state }
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> ChartState {
        self.state.borrow().clone()
    }

    /// Subscribes to committed states. The receiver starts at the current one.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChartState> {
        self.state.subscribe()
    }

    /// Returns the backing storage.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Applies one event and persists what it touches.
    pub fn dispatch(&self, event: ChartEvent) {
        let writes = Writes::from(&event);
        self.state.send_modify(|state| *state = reduce(state, event));
        persist::save(&self.storage, writes, &self.state.borrow());
    }

    /// Applies events in order and commits the result once.
    pub fn dispatch_all(&self, events: impl IntoIterator<Item = ChartEvent>) {
        let mut writes = Vec::new();
        self.state.send_modify(|state| {
            for event in events {
                writes.push(Writes::from(&event));
                *state = reduce(state, event);
            }
        });
        let state = self.state.borrow();
        for w in writes {
            persist::save(&self.storage, w, &state);
        }
    }

    /// Recomputes every selected statement-derived series from a new snapshot.
    pub fn update_metrics(&self, data: FinancialData) {
        self.dispatch(ChartEvent::UpdateMetrics(Arc::new(data)));
    }

    /// Selects or deselects a series.
    pub fn handle_metric_click(&self, name: &str, values: Vec<f64>, dates: Vec<chrono::NaiveDate>) {
        self.dispatch(ChartEvent::MetricClick {
            name: name.to_string(),
            values,
            dates,
        });
    }

    /// Shows or hides a raw, valuation or price series.
    pub fn toggle_metric_visibility(&self, name: &str) {
        self.dispatch(ChartEvent::ToggleMetricVisibility(name.to_string()));
    }

    /// Enables or disables a margin.
    pub fn toggle_margin(&self, kind: MarginKind) {
        self.dispatch(ChartEvent::ToggleMargin(kind));
    }

    /// Enables or disables a return ratio.
    pub fn toggle_return_metric(&self, kind: ReturnKind) {
        self.dispatch(ChartEvent::ToggleReturn(kind));
    }

    /// Flips a valuation flag without computing its series.
    pub fn toggle_valuation_metric(&self, kind: ValuationKind) {
        self.dispatch(ChartEvent::ToggleValuation(kind));
    }

    /// Changes the number of years shown.
    pub fn set_selected_years(&self, years: u32) {
        self.dispatch(ChartEvent::SetSelectedYears(years));
    }

    /// Installs the price pseudo-metric from adjusted closes, or removes it
    /// when no price has one.
    pub fn set_price_series(&self, prices: &[StockPrice]) {
        let points = prices
            .iter()
            .filter_map(|p| p.adjusted_close().map(|close| ChartDataPoint::new(p.date, close)))
            .collect();
        self.dispatch(ChartEvent::SetPriceSeries(points));
    }

    /// Resets the selection and erases it from storage.
    pub fn clear_chart(&self) {
        self.dispatch(ChartEvent::Clear);
    }

    /// Turns a valuation ratio on or off.
    ///
    /// Turning on computes the series first; when the calculator reports no
    /// data the state is left unchanged and `Ok(false)` is returned. Returns
    /// whether the ratio is enabled afterwards.
    ///
    /// # Errors
    ///
    /// Calculator errors other than missing or invalid data.
    #[instrument(skip(self, prices, data), fields(kind = %kind))]
    pub fn apply_valuation(
        &self,
        kind: ValuationKind,
        prices: &[StockPrice],
        data: &FinancialData,
    ) -> Result<bool> {
        let name = kind.name();
        let current = self.state();

        if current.valuation_metrics.contains(&kind) {
            self.dispatch_all([ChartEvent::deselect(name), ChartEvent::ToggleValuation(kind)]);
            return Ok(false);
        }

        let series = match calculate_valuation(kind, prices, data) {
            Ok(series) => series,
            Err(e) if e.is_recoverable_no_data() => {
                warn!(error = %e, "Valuation metric unavailable");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        debug!(points = series.len(), "Valuation metric computed");
        let mut events = Vec::with_capacity(3);
        if current.selected_metric_names.iter().any(|n| n == name) {
            // A stale selection from storage; the click would deselect it.
            events.push(ChartEvent::deselect(name));
        }
        events.push(ChartEvent::select(name, series));
        events.push(ChartEvent::ToggleValuation(kind));
        self.dispatch_all(events);
        Ok(true)
    }
}
