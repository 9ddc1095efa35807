use folio_core::{
    FinancialData, FinancialDataProvider, FolioError, Order, Query, RecordStore, RecordStoreExt,
    Result, Symbol, Table,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Statements and segments of a symbol, served from the record store and
/// refreshed from the upstream provider.
#[derive(Clone)]
pub struct FinancialDataService {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn FinancialDataProvider>,
}

impl std::fmt::Debug for FinancialDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinancialDataService")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

fn by_symbol(symbol: &Symbol) -> Query {
    Query::new()
        .eq("symbol", symbol.as_str())
        .order_by("date", Order::Descending)
}

impl FinancialDataService {
    /// Creates the service.
    pub fn new(store: Arc<dyn RecordStore>, provider: Arc<dyn FinancialDataProvider>) -> Self {
        Self { store, provider }
    }

    /// Reads every stored statement and segment report, newest first.
    ///
    /// # Errors
    /// Returns an error if the store fails or a row does not deserialize.
    pub async fn stored(&self, symbol: &Symbol) -> Result<FinancialData> {
        let query = by_symbol(symbol);
        let store = &*self.store;
        let (income, balance, cash, segments, geo) = futures::try_join!(
            store.select_as(Table::IncomeStatements, &query),
            store.select_as(Table::BalanceSheets, &query),
            store.select_as(Table::CashFlowStatements, &query),
            store.select_as(Table::RevenueSegments, &query),
            store.select_as(Table::RevenueGeoSegments, &query),
        )?;
        Ok(FinancialData {
            income_statements: income,
            balance_sheets: balance,
            cash_flow_statements: cash,
            revenue_segments: segments,
            revenue_geo_segments: geo,
        })
    }

    /// Writes every statement and segment report, replacing rows with the
    /// same `(symbol, date, period)`.
    ///
    /// # Errors
    /// Returns an error if the store rejects a batch.
    pub async fn save(&self, data: &FinancialData) -> Result<usize> {
        let store = &*self.store;
        let (income, balance, cash, segments, geo) = futures::try_join!(
            store.upsert_all(Table::IncomeStatements, &data.income_statements),
            store.upsert_all(Table::BalanceSheets, &data.balance_sheets),
            store.upsert_all(Table::CashFlowStatements, &data.cash_flow_statements),
            store.upsert_all(Table::RevenueSegments, &data.revenue_segments),
            store.upsert_all(Table::RevenueGeoSegments, &data.revenue_geo_segments),
        )?;
        Ok(income + balance + cash + segments + geo)
    }

    /// Loads the data of a symbol.
    ///
    /// Stored data is returned when all three statement tables have rows.
    /// Otherwise, or when `force_refresh` is set, the provider is queried for
    /// annual and quarterly data, the result is upserted and returned.
    ///
    /// # Errors
    /// Returns [`FolioError::NoDataAvailable`] if the provider has nothing for
    /// the symbol, or the store/provider error.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn load(&self, symbol: &Symbol, force_refresh: bool) -> Result<FinancialData> {
        if !force_refresh {
            let stored = self.stored(symbol).await?;
            let complete = !stored.income_statements.is_empty()
                && !stored.balance_sheets.is_empty()
                && !stored.cash_flow_statements.is_empty();
            if complete {
                debug!(statements = stored.len(), "Store hit for financial data");
                return Ok(stored);
            }
            debug!("Store miss for financial data");
        }

        let fresh = self.provider.fetch_all_financials(symbol).await?;
        if fresh.is_empty() {
            return Err(FolioError::NoDataAvailable(format!(
                "{} returned no financial data for {symbol}",
                self.provider.name()
            )));
        }
        let written = self.save(&fresh).await?;
        info!(written, provider = self.provider.name(), "Refreshed financial data");
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{StubProvider, date};
    use folio_core::{BalanceSheet, CashFlowStatement, FiscalPeriod, IncomeStatement};
    use folio_store::InMemoryStore;
    use std::sync::atomic::Ordering;

    fn bundle(revenue: f64) -> FinancialData {
        let symbol = Symbol::new("ACME");
        let d = date("2023-12-31");
        FinancialData {
            income_statements: vec![
                IncomeStatement::new(symbol.clone(), d, FiscalPeriod::FY).with("revenue", revenue),
            ],
            balance_sheets: vec![BalanceSheet::new(symbol.clone(), d, FiscalPeriod::FY)],
            cash_flow_statements: vec![CashFlowStatement::new(symbol, d, FiscalPeriod::FY)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetches_once_then_serves_store() {
        let provider = Arc::new(StubProvider::with_financials(bundle(100.0)));
        let service = FinancialDataService::new(Arc::new(InMemoryStore::new()), provider.clone());
        let symbol = Symbol::new("ACME");

        let first = service.load(&symbol, false).await.unwrap();
        let second = service.load(&symbol, false).await.unwrap();
        assert_eq!(first, second);
        // One call per period type.
        assert_eq!(provider.financial_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_replaces_rows() {
        let provider = Arc::new(StubProvider::with_financials(bundle(100.0)));
        let store = Arc::new(InMemoryStore::new());
        let service = FinancialDataService::new(store.clone(), provider.clone());
        let symbol = Symbol::new("ACME");
        service.load(&symbol, false).await.unwrap();

        *provider.financials.lock().unwrap() = bundle(250.0);
        let refreshed = service.load(&symbol, true).await.unwrap();
        assert_eq!(refreshed.income_statements[0].revenue, Some(250.0));

        let stored = service.stored(&symbol).await.unwrap();
        assert_eq!(stored.income_statements.len(), 1);
        assert_eq!(stored.income_statements[0].revenue, Some(250.0));
    }

    #[tokio::test]
    async fn test_empty_provider_is_no_data() {
        let provider = Arc::new(StubProvider::default());
        let service = FinancialDataService::new(Arc::new(InMemoryStore::new()), provider);
        let err = service.load(&Symbol::new("NONE"), false).await.unwrap_err();
        assert!(err.is_recoverable_no_data());
    }
}
