#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Financial Modeling Prep (FMP) data provider.
//!
//! This crate implements the folio-core provider traits for the
//! [Financial Modeling Prep](https://financialmodelingprep.com/) API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use folio_fmp::FmpProvider;
//! use folio_core::{FinancialDataProvider, PeriodType, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = FmpProvider::new("your_api_key");
//!     let symbol = Symbol::new("AAPL");
//!
//!     let quarterly = provider.fetch_financials(&symbol, PeriodType::Quarterly, None).await?;
//!     println!("{} quarterly income statements", quarterly.income_statements.len());
//!
//!     Ok(())
//! }
//! ```

mod transform;

pub use transform::{convert_to_usd, segment_period};

use async_trait::async_trait;
use chrono::NaiveDate;
use folio_core::{
    BalanceSheet, CashFlowStatement, CompanyInfo, DataProvider, FinancialData,
    FinancialDataProvider, FolioError, IncomeStatement, PeriodType, PriceDataProvider,
    ReferenceDataProvider, Result, SegmentReport, StockPrice, Symbol,
};
use reqwest::Client;
use std::fmt;
use tracing::{debug, instrument, warn};
use transform::{RawPriceResponse, RawProfile, RawQuote, RawSegmentEntry, RawStatement};

/// Base URL for the FMP stable API.
const FMP_BASE_URL: &str = "https://financialmodelingprep.com/stable";

const fn period_param(period_type: PeriodType) -> &'static str {
    match period_type {
        PeriodType::Annual => "annual",
        PeriodType::Quarterly => "quarter",
    }
}

/// Financial Modeling Prep data provider.
///
/// Provides access to:
/// - Income statements, balance sheets, cash flow statements
/// - Revenue product and geographic segmentation
/// - Historical daily prices
/// - Company profiles and currency quotes
#[derive(Clone)]
pub struct FmpProvider {
    client: Client,
    api_key: String,
}

impl fmt::Debug for FmpProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FmpProvider")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl FmpProvider {
    /// Create a new FMP provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Create a new FMP provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Build a URL with the API key appended.
    fn url(&self, endpoint: &str) -> String {
        if endpoint.contains('?') {
            format!("{FMP_BASE_URL}/{endpoint}&apikey={}", self.api_key)
        } else {
            format!("{FMP_BASE_URL}/{endpoint}?apikey={}", self.api_key)
        }
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);
        debug!("FMP request: {}", endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FolioError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FolioError::RateLimited {
                provider: "FMP".to_string(),
                retry_after: None,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(FolioError::Network(format!("HTTP {status}: {text}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| FolioError::Network(e.to_string()))?;

        // FMP reports errors as a JSON object with a message instead of the expected array.
        if text.contains("\"Error Message\"") || text.contains("\"error\"") {
            return Err(FolioError::InvalidResponseFormat(text));
        }

        serde_json::from_str(&text)
            .map_err(|e| FolioError::InvalidResponseFormat(format!("{e}: {text}")))
    }

    async fn fetch_statements(
        &self,
        endpoint: &str,
        symbol: &Symbol,
        period_type: PeriodType,
        limit: Option<usize>,
    ) -> Result<Vec<RawStatement>> {
        let limit_param = limit.map(|l| format!("&limit={l}")).unwrap_or_default();
        let endpoint = format!(
            "{endpoint}?symbol={}&period={}{limit_param}",
            symbol.as_str(),
            period_param(period_type)
        );
        self.get(&endpoint).await
    }

    async fn fetch_segments(
        &self,
        endpoint: &str,
        symbol: &Symbol,
        period_type: PeriodType,
    ) -> Result<Vec<RawSegmentEntry>> {
        let endpoint = format!(
            "{endpoint}?symbol={}&period={}&structure=flat",
            symbol.as_str(),
            period_param(period_type)
        );
        self.get(&endpoint).await
    }

    async fn fetch_profile(&self, symbol: &Symbol) -> Result<Vec<RawProfile>> {
        let endpoint = format!("profile?symbol={}", symbol.as_str());
        self.get(&endpoint).await
    }

    /// Fetches the spot rate converting one unit of `currency` into USD.
    ///
    /// # Errors
    /// Returns [`FolioError::InvalidResponseFormat`] when no quote is available.
    #[instrument(skip(self))]
    pub async fn exchange_rate(&self, currency: &str) -> Result<f64> {
        if currency.is_empty() || currency.eq_ignore_ascii_case("USD") {
            return Ok(1.0);
        }
        let quotes: Vec<RawQuote> = self
            .get(&format!("quote?symbol={}USD", currency.to_uppercase()))
            .await?;
        quotes
            .first()
            .and_then(|q| q.price)
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| {
                FolioError::InvalidResponseFormat(format!(
                    "Could not get exchange rate for {currency}"
                ))
            })
    }

    /// Fetches revenue by product segment.
    ///
    /// # Errors
    /// Returns an error if the request fails or the payload is malformed.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn fetch_revenue_segments(
        &self,
        symbol: &Symbol,
        period_type: PeriodType,
        rate: f64,
    ) -> Result<Vec<SegmentReport>> {
        let raw = self
            .fetch_segments("revenue-product-segmentation", symbol, period_type)
            .await?;
        Ok(transform::segments(raw, symbol, period_type, rate))
    }

    /// Fetches revenue by geographic region.
    ///
    /// # Errors
    /// Returns an error if the request fails or the payload is malformed.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn fetch_revenue_geo_segments(
        &self,
        symbol: &Symbol,
        period_type: PeriodType,
        rate: f64,
    ) -> Result<Vec<SegmentReport>> {
        let raw = self
            .fetch_segments("revenue-geographic-segmentation", symbol, period_type)
            .await?;
        Ok(transform::segments(raw, symbol, period_type, rate))
    }
}

impl DataProvider for FmpProvider {
    fn name(&self) -> &str {
        "FMP"
    }

    fn description(&self) -> &str {
        "Financial Modeling Prep - Financial data and stock market API"
    }
}

#[async_trait]
impl FinancialDataProvider for FmpProvider {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn fetch_financials(
        &self,
        symbol: &Symbol,
        period_type: PeriodType,
        limit: Option<usize>,
    ) -> Result<FinancialData> {
        // Fetch all three statement types in parallel; any failure fails the batch.
        let (income, balance, cash) = tokio::try_join!(
            self.fetch_statements("income-statement", symbol, period_type, limit),
            self.fetch_statements("balance-sheet-statement", symbol, period_type, limit),
            self.fetch_statements("cash-flow-statement", symbol, period_type, limit),
        )?;

        let currency = transform::reported_currency(&income)
            .or_else(|| transform::reported_currency(&balance))
            .unwrap_or_else(|| "USD".to_string());
        let rate = self.exchange_rate(&currency).await?;
        if currency != "USD" {
            debug!(currency = %currency, rate, "Converting statements to USD");
        }

        // Segmentation is optional upstream; missing segments don't fail the fetch.
        let (segments, geo_segments) = tokio::join!(
            self.fetch_revenue_segments(symbol, period_type, rate),
            self.fetch_revenue_geo_segments(symbol, period_type, rate),
        );
        let revenue_segments = segments.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch revenue segments");
            Vec::new()
        });
        let revenue_geo_segments = geo_segments.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to fetch geographic revenue segments");
            Vec::new()
        });

        let data = FinancialData {
            income_statements: transform::statements::<IncomeStatement>(
                &income,
                symbol,
                period_type,
                rate,
            ),
            balance_sheets: transform::statements::<BalanceSheet>(
                &balance,
                symbol,
                period_type,
                rate,
            ),
            cash_flow_statements: transform::statements::<CashFlowStatement>(
                &cash,
                symbol,
                period_type,
                rate,
            ),
            revenue_segments,
            revenue_geo_segments,
        };

        if data.income_statements.is_empty()
            && data.balance_sheets.is_empty()
            && data.cash_flow_statements.is_empty()
        {
            return Err(FolioError::SymbolNotFound(symbol.to_string()));
        }

        debug!(count = data.len(), "Fetched financial data");
        Ok(data)
    }
}

#[async_trait]
impl PriceDataProvider for FmpProvider {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn fetch_prices(
        &self,
        symbol: &Symbol,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<StockPrice>> {
        let mut params = String::new();
        if let Some(f) = from {
            params.push_str(&format!("&from={f}"));
        }
        if let Some(t) = to {
            params.push_str(&format!("&to={t}"));
        }
        let endpoint = format!("historical-price-eod/full?symbol={}{params}", symbol.as_str());

        let (response, profiles) = tokio::join!(
            self.get::<RawPriceResponse>(&endpoint),
            self.fetch_profile(symbol),
        );
        let response = response?;
        let currency = profiles
            .ok()
            .and_then(|p| p.into_iter().next())
            .and_then(|p| p.currency)
            .unwrap_or_else(|| "USD".to_string());
        let rate = self.exchange_rate(&currency).await?;

        Ok(transform::prices(response.into_prices(), symbol, rate))
    }
}

#[async_trait]
impl ReferenceDataProvider for FmpProvider {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn company_info(&self, symbol: &Symbol) -> Result<CompanyInfo> {
        let profiles = self.fetch_profile(symbol).await?;

        let profile = profiles
            .into_iter()
            .next()
            .ok_or_else(|| FolioError::SymbolNotFound(symbol.to_string()))?;

        Ok(profile.into_company_info(symbol))
    }

    async fn supports_symbol(&self, symbol: &Symbol) -> Result<bool> {
        match self.fetch_profile(symbol).await {
            Ok(profiles) => Ok(!profiles.is_empty()),
            Err(FolioError::SymbolNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
