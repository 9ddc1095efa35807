//! No-op storage implementation.

use folio_core::{KeyValueStorage, Result};
use tracing::trace;

/// Client storage that doesn't keep anything.
///
/// `get` always returns `Ok(None)` and writes return `Ok(())`.
/// Useful for running the chart store without persistence.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl NoopStorage {
    /// Create a new no-op storage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl KeyValueStorage for NoopStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        trace!(key, "NoopStorage: get called, returning None");
        Ok(None)
    }

    fn set(&self, key: &str, _value: &str) -> Result<()> {
        trace!(key, "NoopStorage: set called, doing nothing");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        trace!(key, "NoopStorage: remove called, doing nothing");
        Ok(())
    }
}
