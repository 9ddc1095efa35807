#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/folio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Persistence implementations for folio.
//!
//! This crate provides implementations of the collaborator traits from `folio-core`:
//!
//! - [`SqliteStore`] - Persistent SQLite record store (default, requires `sqlite` feature)
//! - [`InMemoryStore`] - Simple in-memory record store for testing
//! - [`SqliteStorage`], [`MemoryStorage`], [`NoopStorage`] - Client key-value storage

/// In-memory implementations.
pub mod memory;
/// No-op storage implementation.
pub mod noop;

/// SQLite-based implementations.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the traits for convenience
pub use folio_core::{KeyValueStorage, RecordStore};

// Re-export implementations
pub use memory::{InMemoryStore, MemoryStorage};
pub use noop::NoopStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteStorage, SqliteStore};
