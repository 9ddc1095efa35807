//! Durable client storage.
//!
//! [`KeyValueStorage`] is the synchronous string key-value store the chart
//! state persists its selection into. Writes happen on every mutating
//! transition; callers log failures instead of surfacing them.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;

/// Well-known storage keys.
pub mod keys {
    /// Whether the chart panel is shown (`"true"`/`"false"`).
    pub const SHOW_CHART: &str = "showChart";
    /// JSON array of selected metric names, in selection order.
    pub const SELECTED_METRICS: &str = "selectedMetrics";
    /// Selected period view (`annual`, `quarterly` or `ttm`).
    pub const SELECTED_PERIOD: &str = "selectedPeriod";
    /// Number of years to show.
    pub const SELECTED_YEARS: &str = "selectedYears";
}

/// Synchronous string key-value storage.
pub trait KeyValueStorage: Send + Sync + Debug {
    /// Reads a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStorage + ?Sized> KeyValueStorage for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
