#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and collaborator traits for the folio investment tracker.
//!
//! - [`Statement`](statements::Statement) - Capability-checked line-item access
//! - [`FinancialData`](statements::FinancialData) - Per-symbol statement bundle
//! - [`RecordStore`](store::RecordStore) - Persistence collaborator
//! - [`KeyValueStorage`](storage::KeyValueStorage) - Durable client storage
//! - [`FinancialDataProvider`](provider::FinancialDataProvider) - Upstream statements
//! - [`PriceDataProvider`](provider::PriceDataProvider) - Upstream prices

/// Error types for folio operations.
pub mod error;
/// Fiscal period, fetch period and view definitions.
pub mod period;
/// Provider traits for fetching upstream data.
pub mod provider;
/// Financial statement and segment types.
pub mod statements;
/// Durable client key-value storage.
pub mod storage;
/// Persistence collaborator trait and query types.
pub mod store;
/// Symbols, prices and company metadata.
pub mod types;

// Re-export commonly used items at crate root
pub use error::{FolioError, Result};
pub use period::{FiscalPeriod, PeriodType, PeriodView};
pub use provider::{DataProvider, FinancialDataProvider, PriceDataProvider, ReferenceDataProvider};
pub use statements::{
    AnyStatement, BalanceSheet, CashFlowStatement, FinancialData, IncomeStatement, SegmentReport,
    Statement, StatementKind, StatementMeta,
};
pub use storage::KeyValueStorage;
pub use store::{Order, Query, RecordStore, RecordStoreExt, Row, Table};
pub use types::{CompanyInfo, StockPrice, Symbol};
