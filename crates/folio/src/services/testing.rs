//! In-process provider double for service tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use folio_core::{
    CompanyInfo, DataProvider, FinancialData, FinancialDataProvider, PeriodType,
    PriceDataProvider, ReferenceDataProvider, Result, StockPrice, Symbol,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Serves annual data, an empty quarterly bundle and a fixed price history.
#[derive(Debug, Default)]
pub(crate) struct StubProvider {
    pub(crate) financials: Mutex<FinancialData>,
    pub(crate) prices: Mutex<Vec<StockPrice>>,
    pub(crate) known: Vec<Symbol>,
    pub(crate) financial_calls: AtomicUsize,
    pub(crate) price_calls: Mutex<Vec<(Option<NaiveDate>, Option<NaiveDate>)>>,
}

impl StubProvider {
    pub(crate) fn with_financials(data: FinancialData) -> Self {
        Self {
            financials: Mutex::new(data),
            ..Default::default()
        }
    }

    pub(crate) fn with_prices(prices: Vec<StockPrice>) -> Self {
        Self {
            prices: Mutex::new(prices),
            ..Default::default()
        }
    }
}

impl DataProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn description(&self) -> &str {
        "test double"
    }
}

#[async_trait]
impl FinancialDataProvider for StubProvider {
    async fn fetch_financials(
        &self,
        _symbol: &Symbol,
        period_type: PeriodType,
        _limit: Option<usize>,
    ) -> Result<FinancialData> {
        self.financial_calls.fetch_add(1, Ordering::SeqCst);
        Ok(match period_type {
            PeriodType::Annual => self.financials.lock().unwrap().clone(),
            PeriodType::Quarterly => FinancialData::default(),
        })
    }
}

#[async_trait]
impl PriceDataProvider for StubProvider {
    async fn fetch_prices(
        &self,
        _symbol: &Symbol,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<StockPrice>> {
        self.price_calls.lock().unwrap().push((from, to));
        Ok(self
            .prices
            .lock()
            .unwrap()
            .iter()
            .filter(|p| from.is_none_or(|f| p.date >= f) && to.is_none_or(|t| p.date <= t))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReferenceDataProvider for StubProvider {
    async fn company_info(&self, symbol: &Symbol) -> Result<CompanyInfo> {
        Ok(CompanyInfo::new(symbol.clone(), format!("{symbol} Inc.")))
    }

    async fn supports_symbol(&self, symbol: &Symbol) -> Result<bool> {
        Ok(self.known.contains(symbol))
    }
}
