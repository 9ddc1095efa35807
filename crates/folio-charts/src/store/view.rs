use folio_core::storage::keys;
use folio_core::{FinancialData, KeyValueStorage, PeriodView};
use tracing::debug;

use super::persist::{read_json, read_str, write_json, write_str};
use super::state::DEFAULT_YEARS;
use crate::filter::filter_financial_data;

/// The statements of one symbol under the selected period view.
///
/// Changing the data, view or years re-runs the period filter; the view and
/// years are persisted.
#[derive(Debug)]
pub struct FinancialView<S> {
    storage: S,
    all: FinancialData,
    filtered: FinancialData,
    period: PeriodView,
    years: u32,
}

impl<S: KeyValueStorage> FinancialView<S> {
    /// Creates an empty view, loading the persisted period and years.
    pub fn new(storage: S) -> Self {
        Self::with_defaults(storage, PeriodView::default(), DEFAULT_YEARS)
    }

    /// Creates an empty view, loading the persisted period and years and
    /// falling back to the given ones.
    pub fn with_defaults(storage: S, period: PeriodView, years: u32) -> Self {
        let period = read_str(&storage, keys::SELECTED_PERIOD)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(period);
        let years = read_json(&storage, keys::SELECTED_YEARS).unwrap_or(years);
        Self {
            storage,
            all: FinancialData::default(),
            filtered: FinancialData::default(),
            period,
            years,
        }
    }

    /// Every statement, unfiltered.
    pub const fn all(&self) -> &FinancialData {
        &self.all
    }

    /// Statements under the current view.
    pub const fn filtered(&self) -> &FinancialData {
        &self.filtered
    }

    /// The selected period view.
    pub const fn period(&self) -> PeriodView {
        self.period
    }

    /// The number of years shown.
    pub const fn years(&self) -> u32 {
        self.years
    }

    fn refilter(&mut self) -> &FinancialData {
        self.filtered = filter_financial_data(&self.all, self.period, self.years);
        debug!(
            period = %self.period,
            years = self.years,
            statements = self.filtered.len(),
            "Filtered financial data"
        );
        &self.filtered
    }

    /// Replaces the data and returns the filtered view.
    pub fn set_data(&mut self, data: FinancialData) -> &FinancialData {
        self.all = data;
        self.refilter()
    }

    /// Changes the period view and returns the filtered view.
    pub fn set_period(&mut self, period: PeriodView) -> &FinancialData {
        self.period = period;
        write_str(&self.storage, keys::SELECTED_PERIOD, period.as_str());
        self.refilter()
    }

    /// Changes the number of years and returns the filtered view.
    pub fn set_years(&mut self, years: u32) -> &FinancialData {
        self.years = years;
        write_json(&self.storage, keys::SELECTED_YEARS, &years);
        self.refilter()
    }
}
