//! SQLite-based store implementations.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use folio_core::{FolioError, KeyValueStorage, Query, RecordStore, Result, Row, Table};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, instrument};

fn db_err(e: impl std::fmt::Display) -> FolioError {
    FolioError::Database(e.to_string())
}

/// Fixed-width UTC timestamp so stored values compare lexicographically.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn key_and_json(r: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((r.get(0)?, r.get(1)?))
}

fn symbol_of(row: &Row) -> Option<&str> {
    row.get("symbol").and_then(Value::as_str)
}

/// SQLite-backed record store.
///
/// Every table shares one `records` relation holding the row as JSON next to
/// its unique key, so new tables need no schema migration. Filters other than
/// `symbol` are evaluated in process.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(db_err)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                table_name TEXT NOT NULL,
                row_key TEXT NOT NULL,
                symbol TEXT,
                data_json TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (table_name, row_key)
            )",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_table_symbol
             ON records(table_name, symbol)",
            [],
        )
        .map_err(db_err)?;

        debug!("SQLite store schema initialized");
        Ok(())
    }

    /// Loads `(row_key, row)` pairs of a table, narrowed by symbol when the
    /// query filters on it.
    fn load(conn: &Connection, table: Table, query: &Query) -> Result<Vec<(String, Row)>> {
        let symbol = query
            .filter_value("symbol")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut stmt = match symbol {
            Some(_) => conn.prepare(
                "SELECT row_key, data_json FROM records
                 WHERE table_name = ?1 AND symbol = ?2 ORDER BY row_key",
            ),
            None => conn.prepare(
                "SELECT row_key, data_json FROM records
                 WHERE table_name = ?1 ORDER BY row_key",
            ),
        }
        .map_err(db_err)?;

        let raw: Vec<(String, String)> = match &symbol {
            Some(s) => stmt.query_map(params![table.name(), s], key_and_json),
            None => stmt.query_map(params![table.name()], key_and_json),
        }
        .map_err(db_err)?
        .collect::<std::result::Result<_, _>>()
        .map_err(db_err)?;

        let mut rows = Vec::with_capacity(raw.len());
        for (key, json) in raw {
            let row: Row = serde_json::from_str(&json)?;
            if query.matches(&row) {
                rows.push((key, row));
            }
        }
        Ok(rows)
    }

    fn write(tx: &Transaction<'_>, table: Table, key: &str, row: &Row, now: &str) -> Result<()> {
        let json = serde_json::to_string(row)?;
        tx.execute(
            "INSERT OR REPLACE INTO records (table_name, row_key, symbol, data_json, cached_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![table.name(), key, symbol_of(row), json, now],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn exists(tx: &Transaction<'_>, table: Table, key: &str) -> Result<bool> {
        let found: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM records WHERE table_name = ?1 AND row_key = ?2",
                params![table.name(), key],
                |r| r.get(0),
            )
            .optional()
            .map_err(db_err)?;
        Ok(found.is_some())
    }

    fn remove(tx: &Transaction<'_>, table: Table, key: &str) -> Result<()> {
        tx.execute(
            "DELETE FROM records WHERE table_name = ?1 AND row_key = ?2",
            params![table.name(), key],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    #[instrument(skip(self, query), fields(table = %table))]
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>> {
        let conn = self.lock()?;
        let rows = Self::load(&conn, table, query)?;
        let rows = query.apply(rows.into_iter().map(|(_, row)| row));
        debug!(count = rows.len(), "Selected rows");
        Ok(rows)
    }

    #[instrument(skip(self, rows), fields(table = %table, count = rows.len()))]
    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<usize> {
        let keys = rows
            .iter()
            .map(|row| table.row_key(row))
            .collect::<Result<Vec<_>>>()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        let now = timestamp(Utc::now());
        let mut seen = HashSet::with_capacity(keys.len());
        for (key, row) in keys.iter().zip(&rows) {
            if !seen.insert(key.as_str()) || Self::exists(&tx, table, key)? {
                // Dropping the transaction rolls back earlier writes.
                return Err(FolioError::Database(format!(
                    "duplicate key value violates unique constraint on {table}: {key}"
                )));
            }
            Self::write(&tx, table, key, row, &now)?;
        }
        tx.commit().map_err(db_err)?;
        debug!(count = rows.len(), "Inserted rows");
        Ok(rows.len())
    }

    #[instrument(skip(self, query, patch), fields(table = %table))]
    async fn update(&self, table: Table, query: &Query, patch: Row) -> Result<Vec<Row>> {
        let mut conn = self.lock()?;
        let matching = Self::load(&conn, table, query)?;

        let tx = conn.transaction().map_err(db_err)?;
        let now = timestamp(Utc::now());
        let mut updated = Vec::with_capacity(matching.len());
        for (old_key, mut row) in matching {
            row.extend(patch.clone());
            let new_key = table.row_key(&row)?;
            if new_key != old_key {
                Self::remove(&tx, table, &old_key)?;
            }
            Self::write(&tx, table, &new_key, &row, &now)?;
            updated.push(row);
        }
        tx.commit().map_err(db_err)?;
        debug!(count = updated.len(), "Updated rows");
        Ok(updated)
    }

    #[instrument(skip(self, rows), fields(table = %table, count = rows.len()))]
    async fn upsert(&self, table: Table, rows: Vec<Row>) -> Result<usize> {
        let mut batch = Vec::with_capacity(rows.len());
        let mut seen = HashSet::with_capacity(rows.len());
        for row in rows {
            let key = table.row_key(&row)?;
            if seen.insert(key.clone()) {
                batch.push((key, row));
            }
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        let now = timestamp(Utc::now());
        for (key, row) in &batch {
            Self::write(&tx, table, key, row, &now)?;
        }
        tx.commit().map_err(db_err)?;
        debug!(count = batch.len(), "Upserted rows");
        Ok(batch.len())
    }

    #[instrument(skip(self, query), fields(table = %table))]
    async fn delete(&self, table: Table, query: &Query) -> Result<usize> {
        let mut conn = self.lock()?;
        let matching = Self::load(&conn, table, query)?;

        let tx = conn.transaction().map_err(db_err)?;
        for (key, _) in &matching {
            Self::remove(&tx, table, key)?;
        }
        tx.commit().map_err(db_err)?;
        debug!(removed = matching.len(), "Deleted rows");
        Ok(matching.len())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let ttl = chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX);
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            return Ok(0);
        };
        let conn = self.lock()?;
        let removed = conn
            .execute(
                "DELETE FROM records WHERE cached_at < ?1",
                params![timestamp(cutoff)],
            )
            .map_err(db_err)?;
        debug!(removed, "Invalidated stale rows");
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM records", []).map_err(db_err)?;
        debug!("Store cleared");
        Ok(())
    }
}

/// SQLite-backed client storage.
///
/// Keeps the chart preferences in a `kv_storage` table so they survive restarts.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) storage at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| FolioError::Storage(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Create in-memory storage.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| FolioError::Storage(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| FolioError::Storage(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FolioError::Storage(e.to_string()))
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM kv_storage WHERE key = ?1",
            params![key],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| FolioError::Storage(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv_storage (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| FolioError::Storage(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv_storage WHERE key = ?1", params![key])
            .map_err(|e| FolioError::Storage(e.to_string()))?;
        Ok(())
    }
}
