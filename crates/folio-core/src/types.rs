//! Core data types shared across the workspace.
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`StockPrice`] - End-of-day price record
//! - [`CompanyInfo`] - Company reference information

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the symbol is empty after trimming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// End-of-day price record keyed by `(symbol, date)`.
///
/// Every price field may be missing upstream; only `volume` is always present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StockPrice {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Trading date.
    pub date: NaiveDate,
    /// Opening price.
    #[serde(default)]
    pub open: Option<f64>,
    /// Highest price of the session.
    #[serde(default)]
    pub high: Option<f64>,
    /// Lowest price of the session.
    #[serde(default)]
    pub low: Option<f64>,
    /// Closing price.
    #[serde(default)]
    pub close: Option<f64>,
    /// Split/dividend adjusted closing price.
    #[serde(default)]
    pub adj_close: Option<f64>,
    /// Traded volume.
    #[serde(default)]
    pub volume: f64,
    /// Volume before split adjustment.
    #[serde(default)]
    pub unadjusted_volume: Option<f64>,
    /// Absolute change from the previous close.
    #[serde(default)]
    pub change: Option<f64>,
    /// Percent change from the previous close.
    #[serde(default)]
    pub change_percent: Option<f64>,
    /// Volume-weighted average price.
    #[serde(default)]
    pub vwap: Option<f64>,
}

impl StockPrice {
    /// Creates a price record with only the adjusted close set.
    #[must_use]
    pub fn adjusted(symbol: Symbol, date: NaiveDate, adj_close: f64) -> Self {
        Self {
            symbol,
            date,
            adj_close: Some(adj_close),
            ..Default::default()
        }
    }

    /// Returns the adjusted close when it is a finite number.
    #[must_use]
    pub fn adjusted_close(&self) -> Option<f64> {
        self.adj_close.filter(|v| v.is_finite())
    }
}

/// Company reference information, stored in `stock_metadata`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Company name.
    pub name: String,
    /// Primary exchange.
    pub exchange: String,
    /// Business sector.
    pub sector: String,
    /// Industry within the sector.
    pub industry: String,
    /// Country of incorporation.
    pub country: String,
    /// Trading currency.
    pub currency: String,
    /// SEC CIK number.
    #[serde(default)]
    pub cik: Option<String>,
    /// ISIN identifier.
    #[serde(default)]
    pub isin: Option<String>,
    /// Business description.
    #[serde(default)]
    pub description: Option<String>,
}

impl CompanyInfo {
    /// Creates new company info with the name set.
    #[must_use]
    pub fn new(symbol: Symbol, name: impl Into<String>) -> Self {
        Self {
            symbol,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the SEC CIK number.
    #[must_use]
    pub fn with_cik(mut self, cik: impl Into<String>) -> Self {
        self.cik = Some(cik.into());
        self
    }

    /// Sets the business description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalization() {
        assert_eq!(Symbol::new(" aapl ").as_str(), "AAPL");
        assert_eq!(Symbol::from("msft"), Symbol::new("MSFT"));
        assert!(Symbol::new("  ").is_empty());
    }

    #[test]
    fn test_adjusted_close_rejects_nan() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut price = StockPrice::adjusted(Symbol::new("AAPL"), date, 185.0);
        assert_eq!(price.adjusted_close(), Some(185.0));
        price.adj_close = Some(f64::NAN);
        assert_eq!(price.adjusted_close(), None);
    }

    #[test]
    fn test_price_deserializes_nulls() {
        let json = r#"{"symbol":"AAPL","date":"2024-01-02","open":null,"adj_close":10.5,"volume":100}"#;
        let price: StockPrice = serde_json::from_str(json).unwrap();
        assert_eq!(price.open, None);
        assert_eq!(price.adj_close, Some(10.5));
        assert_eq!(price.volume, 100.0);
    }
}
