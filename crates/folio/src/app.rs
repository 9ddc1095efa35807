use folio_charts::{ChartStore, FinancialView};
use folio_charts::store::DEFAULT_YEARS;
use folio_core::{
    FinancialDataProvider, KeyValueStorage, PeriodView, PriceDataProvider, RecordStore,
    ReferenceDataProvider, Result,
};
use std::sync::Arc;

use crate::services::{
    FinancialDataService, PriceService, ReferenceService, StockListService, WikiService,
};

/// Every service wired to one record store, one client storage and one
/// upstream provider.
#[derive(Clone)]
pub struct Folio {
    store: Arc<dyn RecordStore>,
    storage: Arc<dyn KeyValueStorage>,
    financials: FinancialDataService,
    prices: PriceService,
    reference: ReferenceService,
    lists: StockListService,
    wiki: WikiService,
    period: PeriodView,
    years: u32,
}

impl std::fmt::Debug for Folio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Folio")
            .field("financials", &self.financials)
            .field("prices", &self.prices)
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl Folio {
    /// Wires the services to the given collaborators.
    pub fn from_parts<P>(
        store: Arc<dyn RecordStore>,
        provider: Arc<P>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self
    where
        P: FinancialDataProvider + PriceDataProvider + ReferenceDataProvider + 'static,
    {
        Self {
            financials: FinancialDataService::new(Arc::clone(&store), provider.clone()),
            prices: PriceService::new(Arc::clone(&store), provider.clone()),
            reference: ReferenceService::new(Arc::clone(&store), provider),
            lists: StockListService::new(Arc::clone(&store)),
            wiki: WikiService::new(Arc::clone(&store)),
            store,
            storage,
            period: PeriodView::default(),
            years: DEFAULT_YEARS,
        }
    }

    /// Sets the period view and years used until the user picks their own.
    #[must_use]
    pub const fn with_defaults(mut self, period: PeriodView, years: u32) -> Self {
        self.period = period;
        self.years = years;
        self
    }

    /// Opens the SQLite database named by the configuration and connects to
    /// Financial Modeling Prep. Stale records are dropped when a TTL is set.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or pruned.
    #[cfg(all(feature = "fmp", feature = "sqlite"))]
    pub async fn open(config: &crate::FolioConfig) -> Result<Self> {
        use folio_core::FolioError;
        use folio_store::{SqliteStorage, SqliteStore};
        use tracing::info;

        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FolioError::Storage(e.to_string()))?;
        }
        let store = Arc::new(SqliteStore::new(&config.db_path)?);
        if let Some(ttl) = config.cache_ttl() {
            let removed = store.invalidate_stale(ttl).await?;
            info!(removed, "Dropped stale records");
        }
        let storage = Arc::new(SqliteStorage::new(&config.db_path)?);
        let provider = Arc::new(folio_fmp::FmpProvider::new(config.fmp_api_key.clone()));
        Ok(Self::from_parts(store, provider, storage).with_defaults(config.period, config.years))
    }

    /// The record store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Statements and segments.
    pub const fn financials(&self) -> &FinancialDataService {
        &self.financials
    }

    /// End-of-day prices.
    pub const fn prices(&self) -> &PriceService {
        &self.prices
    }

    /// Symbol checks and company profiles.
    pub const fn reference(&self) -> &ReferenceService {
        &self.reference
    }

    /// Stock lists.
    pub const fn lists(&self) -> &StockListService {
        &self.lists
    }

    /// Company wiki.
    pub const fn wiki(&self) -> &WikiService {
        &self.wiki
    }

    /// A chart store persisting into the client storage.
    pub fn chart_store(&self) -> ChartStore<Arc<dyn KeyValueStorage>> {
        ChartStore::new(Arc::clone(&self.storage))
    }

    /// A period view persisting into the client storage.
    pub fn financial_view(&self) -> FinancialView<Arc<dyn KeyValueStorage>> {
        FinancialView::with_defaults(Arc::clone(&self.storage), self.period, self.years)
    }
}
