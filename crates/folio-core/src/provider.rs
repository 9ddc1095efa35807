//! Provider traits for fetching upstream financial data.
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`FinancialDataProvider`] - Statements and revenue segments
//! - [`PriceDataProvider`] - End-of-day prices
//! - [`ReferenceDataProvider`] - Company metadata and symbol checks

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Debug;

use crate::{
    error::Result,
    period::PeriodType,
    statements::FinancialData,
    types::{CompanyInfo, StockPrice, Symbol},
};

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "FMP").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for financial statements and revenue segments.
#[async_trait]
pub trait FinancialDataProvider: DataProvider {
    /// Fetches statements and segments of one period type, converted to USD.
    ///
    /// # Arguments
    ///
    /// * `symbol` - The stock symbol
    /// * `period_type` - Annual or Quarterly
    /// * `limit` - Maximum number of periods to return (most recent first)
    async fn fetch_financials(
        &self,
        symbol: &Symbol,
        period_type: PeriodType,
        limit: Option<usize>,
    ) -> Result<FinancialData>;

    /// Fetches annual and quarterly data and merges them into one bundle.
    ///
    /// Default implementation calls `fetch_financials` once per period type.
    async fn fetch_all_financials(&self, symbol: &Symbol) -> Result<FinancialData> {
        let mut data = FinancialData::default();
        for period_type in PeriodType::ALL {
            data.merge(self.fetch_financials(symbol, period_type, None).await?);
        }
        Ok(data)
    }
}

/// Provider for end-of-day prices.
#[async_trait]
pub trait PriceDataProvider: DataProvider {
    /// Fetches daily prices between `from` and `to` inclusive, oldest first,
    /// with price fields converted to USD.
    async fn fetch_prices(
        &self,
        symbol: &Symbol,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<StockPrice>>;
}

/// Provider for reference data.
#[async_trait]
pub trait ReferenceDataProvider: DataProvider {
    /// Fetches company information for a symbol.
    async fn company_info(&self, symbol: &Symbol) -> Result<CompanyInfo>;

    /// Checks if a symbol is known to this provider.
    async fn supports_symbol(&self, symbol: &Symbol) -> Result<bool>;
}
