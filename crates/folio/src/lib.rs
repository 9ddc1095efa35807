#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Fundamentals, valuation charts and stock lists.
//!
//! This crate re-exports the workspace and wires its pieces into services.
//!
//! # Features
//!
//! - `fmp` - Financial Modeling Prep provider
//! - `sqlite` - SQLite record store and client storage
//!
//! # Example
//!
//! ```rust,ignore
//! use folio::{Folio, FolioConfig, Symbol, charts};
//!
//! #[tokio::main]
//! async fn main() -> folio::Result<()> {
//!     let config = FolioConfig::from_env()?;
//!     let folio = Folio::open(&config).await?;
//!
//!     let data = folio.financials().load(&Symbol::new("AAPL"), false).await?;
//!     let margins = charts::calculate_margin(charts::MarginKind::NetIncome, &data)?;
//!     println!("{} net income margin points", margins.len());
//!
//!     Ok(())
//! }
//! ```

mod app;
/// Runtime configuration.
pub mod config;
/// Response envelope and session checks.
pub mod response;
pub mod services;

pub use app::Folio;
pub use config::FolioConfig;
pub use response::{ApiResponse, Session};
pub use services::{
    FinancialDataService, ListName, PriceService, ReferenceService, StockListService, UserStock,
    WikiEntry, WikiHistoryEntry, WikiService,
};

// Core types and traits
pub use folio_core::*;

// Charting pipeline
pub use folio_charts as charts;

// Store implementations
#[cfg(feature = "sqlite")]
pub use folio_store::{SqliteStorage, SqliteStore};
pub use folio_store::{InMemoryStore, MemoryStorage, NoopStorage};

// Providers
#[cfg(feature = "fmp")]
pub use folio_fmp::FmpProvider;
