use folio_core::{
    CompanyInfo, FolioError, Query, RecordStore, RecordStoreExt, ReferenceDataProvider, Result,
    Symbol, Table,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Symbol checks and company profiles, cached in `stock_metadata`.
#[derive(Clone)]
pub struct ReferenceService {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn ReferenceDataProvider>,
}

impl std::fmt::Debug for ReferenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceService")
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

impl ReferenceService {
    /// Creates the service.
    pub fn new(store: Arc<dyn RecordStore>, provider: Arc<dyn ReferenceDataProvider>) -> Self {
        Self { store, provider }
    }

    /// Returns true if the provider knows the symbol. Blank symbols are never
    /// valid.
    ///
    /// # Errors
    /// Returns the provider error.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn check_symbol(&self, symbol: &Symbol) -> Result<bool> {
        if symbol.is_empty() {
            return Ok(false);
        }
        self.provider.supports_symbol(symbol).await
    }

    /// Returns the company profile, fetching and caching it on a miss.
    ///
    /// # Errors
    /// Returns [`FolioError::InvalidParameter`] for a blank symbol, or the
    /// store or provider error.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn company_info(&self, symbol: &Symbol, force_refresh: bool) -> Result<CompanyInfo> {
        if symbol.is_empty() {
            return Err(FolioError::InvalidParameter("Symbol is required".into()));
        }
        let query = Query::new().eq("symbol", symbol.as_str()).limit(1);
        if !force_refresh {
            let cached: Vec<CompanyInfo> = self.store.select_as(Table::StockMetadata, &query).await?;
            if let Some(info) = cached.into_iter().next() {
                debug!("Store hit for company info");
                return Ok(info);
            }
        }
        let info = self.provider.company_info(symbol).await?;
        self.store
            .upsert_all(Table::StockMetadata, std::slice::from_ref(&info))
            .await?;
        Ok(info)
    }
}
