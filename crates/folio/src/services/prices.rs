use chrono::{Days, NaiveDate};
use folio_core::{
    Order, PriceDataProvider, Query, RecordStore, RecordStoreExt, Result, StockPrice, Symbol,
    Table,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// End-of-day prices of a symbol, synced incrementally from the provider.
#[derive(Clone)]
pub struct PriceService {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn PriceDataProvider>,
}

impl std::fmt::Debug for PriceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceService")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

impl PriceService {
    /// Creates the service.
    pub fn new(store: Arc<dyn RecordStore>, provider: Arc<dyn PriceDataProvider>) -> Self {
        Self { store, provider }
    }

    async fn stored(&self, symbol: &Symbol) -> Result<Vec<StockPrice>> {
        let query = Query::new()
            .eq("symbol", symbol.as_str())
            .order_by("date", Order::Ascending);
        self.store.select_as(Table::StockPrices, &query).await
    }

    /// Loads prices between `from` and `to` inclusive, oldest first.
    ///
    /// Without stored prices, or with `force_refresh`, the whole window is
    /// fetched. Otherwise only the days after the newest stored price are
    /// requested when the window reaches past it.
    ///
    /// # Errors
    /// Returns the store or provider error.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn load(
        &self,
        symbol: &Symbol,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        force_refresh: bool,
    ) -> Result<Vec<StockPrice>> {
        let stored = self.stored(symbol).await?;
        let latest = stored.last().map(|p| p.date);

        let fetch_from = match latest {
            Some(latest) if !force_refresh => {
                let next = latest.checked_add_days(Days::new(1));
                next.filter(|next| to.is_none_or(|to| *next <= to))
                    .map(|next| Some(from.map_or(next, |from| from.max(next))))
            }
            _ => Some(from),
        };

        let prices = match fetch_from {
            Some(fetch_from) => {
                let fresh = self.provider.fetch_prices(symbol, fetch_from, to).await?;
                debug!(fetched = fresh.len(), from = ?fetch_from, "Fetched prices");
                if fresh.is_empty() {
                    stored
                } else {
                    self.store.upsert_all(Table::StockPrices, &fresh).await?;
                    self.stored(symbol).await?
                }
            }
            None => {
                debug!(count = stored.len(), "Store hit for prices");
                stored
            }
        };

        Ok(prices
            .into_iter()
            .filter(|p| from.is_none_or(|f| p.date >= f) && to.is_none_or(|t| p.date <= t))
            .collect())
    }
}
