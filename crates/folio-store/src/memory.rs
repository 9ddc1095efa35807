//! In-memory store implementations.

use async_trait::async_trait;
use chrono::Utc;
use folio_core::{FolioError, KeyValueStorage, Query, RecordStore, Result, Row, Table};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock as SyncRwLock;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Stored row with the time it was written, for TTL-based invalidation.
#[derive(Debug, Clone)]
struct StoredRow {
    row: Row,
    cached_at: chrono::DateTime<Utc>,
}

impl StoredRow {
    fn new(row: Row) -> Self {
        Self {
            row,
            cached_at: Utc::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.cached_at);
        age > chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }
}

type TableRows = BTreeMap<String, StoredRow>;

/// Simple in-memory record store for testing and development.
///
/// Rows live in a `RwLock`-protected map keyed by table and unique key, and are
/// lost when the store is dropped. Unordered selects return rows in key order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<Table, TableRows>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held in a table.
    pub async fn len(&self, table: Table) -> usize {
        self.tables.read().await.get(&table).map_or(0, BTreeMap::len)
    }

    /// Returns true if no table holds any row.
    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.values().all(BTreeMap::is_empty)
    }
}

/// Rejects a batch whose keys collide with each other or with stored rows.
fn check_conflicts(table: Table, existing: Option<&TableRows>, keys: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(keys.len());
    for key in keys {
        if !seen.insert(key.as_str()) || existing.is_some_and(|rows| rows.contains_key(key)) {
            return Err(FolioError::Database(format!(
                "duplicate key value violates unique constraint on {table}: {key}"
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl RecordStore for InMemoryStore {
    #[instrument(skip(self, query), fields(table = %table))]
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>> {
        let tables = self.tables.read().await;
        let rows = tables
            .get(&table)
            .map(|rows| query.apply(rows.values().map(|stored| stored.row.clone())))
            .unwrap_or_default();
        debug!(count = rows.len(), "Selected rows");
        Ok(rows)
    }

    #[instrument(skip(self, rows), fields(table = %table, count = rows.len()))]
    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<usize> {
        let keys = rows
            .iter()
            .map(|row| table.row_key(row))
            .collect::<Result<Vec<_>>>()?;

        let mut tables = self.tables.write().await;
        check_conflicts(table, tables.get(&table), &keys)?;

        let entry = tables.entry(table).or_default();
        let count = rows.len();
        for (key, row) in keys.into_iter().zip(rows) {
            entry.insert(key, StoredRow::new(row));
        }
        debug!(count, "Inserted rows");
        Ok(count)
    }

    #[instrument(skip(self, query, patch), fields(table = %table))]
    async fn update(&self, table: Table, query: &Query, patch: Row) -> Result<Vec<Row>> {
        let mut tables = self.tables.write().await;
        let Some(entry) = tables.get_mut(&table) else {
            return Ok(Vec::new());
        };

        let matching: Vec<String> = entry
            .iter()
            .filter(|(_, stored)| query.matches(&stored.row))
            .map(|(key, _)| key.clone())
            .collect();

        // Build every merged row first so a key error leaves the table untouched.
        let mut merged = Vec::with_capacity(matching.len());
        for old_key in &matching {
            let Some(stored) = entry.get(old_key) else {
                continue;
            };
            let mut row = stored.row.clone();
            row.extend(patch.clone());
            let new_key = table.row_key(&row)?;
            merged.push((old_key.clone(), new_key, row));
        }

        let mut updated = Vec::with_capacity(merged.len());
        for (old_key, new_key, row) in merged {
            entry.remove(&old_key);
            entry.insert(new_key, StoredRow::new(row.clone()));
            updated.push(row);
        }
        debug!(count = updated.len(), "Updated rows");
        Ok(updated)
    }

    #[instrument(skip(self, rows), fields(table = %table, count = rows.len()))]
    async fn upsert(&self, table: Table, rows: Vec<Row>) -> Result<usize> {
        let mut batch: Vec<(String, Row)> = Vec::with_capacity(rows.len());
        let mut seen = HashSet::with_capacity(rows.len());
        for row in rows {
            let key = table.row_key(&row)?;
            if seen.insert(key.clone()) {
                batch.push((key, row));
            }
        }

        let mut tables = self.tables.write().await;
        let entry = tables.entry(table).or_default();
        let count = batch.len();
        for (key, row) in batch {
            entry.insert(key, StoredRow::new(row));
        }
        debug!(count, "Upserted rows");
        Ok(count)
    }

    #[instrument(skip(self, query), fields(table = %table))]
    async fn delete(&self, table: Table, query: &Query) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let Some(entry) = tables.get_mut(&table) else {
            return Ok(0);
        };
        let before = entry.len();
        entry.retain(|_, stored| !query.matches(&stored.row));
        let removed = before - entry.len();
        debug!(removed, "Deleted rows");
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let mut removed = 0;
        for entry in tables.values_mut() {
            let before = entry.len();
            entry.retain(|_, stored| !stored.is_stale(ttl));
            removed += before - entry.len();
        }
        debug!(removed, "Invalidated stale rows");
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.tables.write().await.clear();
        debug!("Store cleared");
        Ok(())
    }
}

/// In-memory client storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: SyncRwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> FolioError {
        FolioError::Storage(e.to_string())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().map_err(Self::poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().map_err(Self::poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().map_err(Self::poisoned)?;
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::Order;
    use serde_json::{Value, json};

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn income(date: &str, revenue: f64) -> Row {
        row(json!({"symbol": "AAPL", "date": date, "period": "FY", "revenue": revenue}))
    }

    #[tokio::test]
    async fn test_insert_and_select() {
        let store = InMemoryStore::new();
        let inserted = store
            .insert(
                Table::IncomeStatements,
                vec![income("2022-12-31", 1.0), income("2023-12-31", 2.0)],
            )
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let query = Query::new()
            .eq("symbol", "AAPL")
            .order_by("date", Order::Descending);
        let rows = store.select(Table::IncomeStatements, &query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["date"], json!("2023-12-31"));

        let none = store
            .select(Table::BalanceSheets, &Query::new())
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_insert_conflict_writes_nothing() {
        let store = InMemoryStore::new();
        store
            .insert(Table::IncomeStatements, vec![income("2023-12-31", 1.0)])
            .await
            .unwrap();

        let err = store
            .insert(
                Table::IncomeStatements,
                vec![income("2024-12-31", 3.0), income("2023-12-31", 2.0)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Database(_)));
        assert_eq!(store.len(Table::IncomeStatements).await, 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_dedups_first_wins() {
        let store = InMemoryStore::new();
        store
            .upsert(Table::IncomeStatements, vec![income("2023-12-31", 1.0)])
            .await
            .unwrap();
        let written = store
            .upsert(
                Table::IncomeStatements,
                vec![income("2023-12-31", 5.0), income("2023-12-31", 9.0)],
            )
            .await
            .unwrap();
        assert_eq!(written, 1);

        let rows = store
            .select(Table::IncomeStatements, &Query::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["revenue"], json!(5.0));
    }

    #[tokio::test]
    async fn test_upsert_rejects_missing_key() {
        let store = InMemoryStore::new();
        let err = store
            .upsert(Table::StockPrices, vec![row(json!({"symbol": "AAPL"}))])
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Database(_)));
    }

    #[tokio::test]
    async fn test_update_merges_and_returns_rows() {
        let store = InMemoryStore::new();
        store
            .insert(
                Table::CompanyWiki,
                vec![row(json!({"symbol": "AAPL", "section": "moat", "content": "old"}))],
            )
            .await
            .unwrap();

        let query = Query::new().eq("symbol", "AAPL").eq("section", "moat");
        let updated = store
            .update(
                Table::CompanyWiki,
                &query,
                row(json!({"content": "new", "last_edited_by": "u1"})),
            )
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["content"], json!("new"));

        let rows = store.select(Table::CompanyWiki, &query).await.unwrap();
        assert_eq!(rows[0]["last_edited_by"], json!("u1"));
    }

    #[tokio::test]
    async fn test_update_rekeys_rows() {
        let store = InMemoryStore::new();
        store
            .insert(Table::StockPrices, vec![row(json!({"symbol": "AAPL", "date": "2024-01-02"}))])
            .await
            .unwrap();
        store
            .update(
                Table::StockPrices,
                &Query::new().eq("symbol", "AAPL"),
                row(json!({"date": "2024-01-03"})),
            )
            .await
            .unwrap();

        // The old key is free again.
        store
            .insert(Table::StockPrices, vec![row(json!({"symbol": "AAPL", "date": "2024-01-02"}))])
            .await
            .unwrap();
        assert_eq!(store.len(Table::StockPrices).await, 2);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = InMemoryStore::new();
        store
            .insert(
                Table::IncomeStatements,
                vec![income("2022-12-31", 1.0), income("2023-12-31", 2.0)],
            )
            .await
            .unwrap();

        let removed = store
            .delete(Table::IncomeStatements, &Query::new().eq("date", "2022-12-31"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(Table::IncomeStatements).await, 1);

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_stale() {
        let store = InMemoryStore::new();
        store
            .insert(Table::IncomeStatements, vec![income("2023-12-31", 1.0)])
            .await
            .unwrap();

        let removed = store
            .invalidate_stale(Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);

        tokio::time::sleep(Duration::from_millis(5)).await;
        let removed = store.invalidate_stale(Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("selectedYears").unwrap(), None);
        storage.set("selectedYears", "5").unwrap();
        assert_eq!(storage.get("selectedYears").unwrap().as_deref(), Some("5"));
        storage.remove("selectedYears").unwrap();
        assert_eq!(storage.get("selectedYears").unwrap(), None);
    }
}
