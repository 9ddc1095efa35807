//! Durable client storage of the chart selection.
//!
//! Reads fall back to defaults and writes are logged on failure; neither is
//! ever surfaced to the caller.

use folio_core::KeyValueStorage;
use folio_core::storage::keys;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::state::{ChartEvent, ChartState, DEFAULT_YEARS};

/// Reads and parses a JSON value, or returns `None`.
pub(crate) fn read_json<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str) -> Option<T> {
    match storage.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw)
            .inspect_err(|e| warn!(key, error = %e, "Ignoring unparseable stored value"))
            .ok(),
        Ok(None) => None,
        Err(e) => {
            warn!(key, error = %e, "Failed to read stored value");
            None
        }
    }
}

/// Reads a raw string value, or returns `None`.
pub(crate) fn read_str(storage: &dyn KeyValueStorage, key: &str) -> Option<String> {
    storage
        .get(key)
        .inspect_err(|e| warn!(key, error = %e, "Failed to read stored value"))
        .ok()
        .flatten()
}

/// Writes a JSON value, logging failures.
pub(crate) fn write_json<T: Serialize + ?Sized>(storage: &dyn KeyValueStorage, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => write_str(storage, key, &raw),
        Err(e) => warn!(key, error = %e, "Failed to encode value for storage"),
    }
}

/// Writes a raw string value, logging failures.
pub(crate) fn write_str(storage: &dyn KeyValueStorage, key: &str, value: &str) {
    if let Err(e) = storage.set(key, value) {
        warn!(key, error = %e, "Failed to persist value");
    }
}

fn remove(storage: &dyn KeyValueStorage, key: &str) {
    if let Err(e) = storage.remove(key) {
        warn!(key, error = %e, "Failed to remove stored value");
    }
}

/// Loads the persisted part of the chart state.
pub(crate) fn load(storage: &dyn KeyValueStorage) -> ChartState {
    ChartState {
        show_chart: read_json(storage, keys::SHOW_CHART).unwrap_or(false),
        selected_metric_names: read_json(storage, keys::SELECTED_METRICS).unwrap_or_default(),
        selected_years: read_json(storage, keys::SELECTED_YEARS).unwrap_or(DEFAULT_YEARS),
        ..ChartState::default()
    }
}

/// What an event writes to storage once applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Writes {
    /// `showChart` and `selectedMetrics`.
    Selection,
    /// `selectedYears`.
    Years,
    /// Removes `showChart` and `selectedMetrics`.
    Cleared,
    /// Nothing.
    None,
}

impl From<&ChartEvent> for Writes {
    fn from(event: &ChartEvent) -> Self {
        match event {
            ChartEvent::UpdateMetrics(_)
            | ChartEvent::MetricClick { .. }
            | ChartEvent::ToggleValuation(_)
            | ChartEvent::SetPriceSeries(_) => Self::Selection,
            ChartEvent::SetSelectedYears(_) => Self::Years,
            ChartEvent::Clear => Self::Cleared,
            ChartEvent::ToggleMetricVisibility(_)
            | ChartEvent::ToggleMargin(_)
            | ChartEvent::ToggleReturn(_) => Self::None,
        }
    }
}

/// Persists the keys an event touches.
pub(crate) fn save(storage: &dyn KeyValueStorage, writes: Writes, state: &ChartState) {
    match writes {
        Writes::Selection => {
            write_json(storage, keys::SHOW_CHART, &state.show_chart);
            write_json(storage, keys::SELECTED_METRICS, &state.selected_metric_names);
        }
        Writes::Years => write_json(storage, keys::SELECTED_YEARS, &state.selected_years),
        Writes::Cleared => {
            remove(storage, keys::SHOW_CHART);
            remove(storage, keys::SELECTED_METRICS);
        }
        Writes::None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_store::MemoryStorage;

    #[test]
    fn test_load_defaults_when_empty() {
        let state = load(&MemoryStorage::new());
        assert!(!state.show_chart);
        assert!(state.selected_metric_names.is_empty());
        assert_eq!(state.selected_years, DEFAULT_YEARS);
    }

    #[test]
    fn test_load_ignores_garbage() {
        let storage = MemoryStorage::new();
        storage.set(keys::SELECTED_METRICS, "not json").unwrap();
        storage.set(keys::SELECTED_YEARS, "5").unwrap();
        let state = load(&storage);
        assert!(state.selected_metric_names.is_empty());
        assert_eq!(state.selected_years, 5);
    }

    #[test]
    fn test_selection_round_trip() {
        let storage = MemoryStorage::new();
        let mut state = ChartState::default();
        state.show_chart = true;
        state.selected_metric_names = vec!["Revenue".into(), "P/E Ratio".into()];
        save(&storage, Writes::Selection, &state);
        assert_eq!(
            storage.get(keys::SELECTED_METRICS).unwrap().as_deref(),
            Some(r#"["Revenue","P/E Ratio"]"#)
        );

        let loaded = load(&storage);
        assert!(loaded.show_chart);
        assert_eq!(loaded.selected_metric_names, state.selected_metric_names);

        save(&storage, Writes::Cleared, &state);
        assert_eq!(storage.get(keys::SHOW_CHART).unwrap(), None);
    }
}
