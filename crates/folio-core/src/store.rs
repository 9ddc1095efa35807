//! Persistence collaborator.
//!
//! This module defines the [`RecordStore`] trait, a generic queryable store over
//! the named [`Table`]s the application persists. Rows are JSON objects; each
//! table declares the columns of its unique key, which drive upsert conflict
//! resolution.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{FolioError, Result};
use crate::statements::StatementKind;

/// A stored row.
pub type Row = serde_json::Map<String, Value>;

/// Named tables of the persistence layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Income statements.
    IncomeStatements,
    /// Balance sheets.
    BalanceSheets,
    /// Cash flow statements.
    CashFlowStatements,
    /// Revenue by product segment.
    RevenueSegments,
    /// Revenue by geographic region.
    RevenueGeoSegments,
    /// End-of-day prices.
    StockPrices,
    /// Company reference data.
    StockMetadata,
    /// Stocks placed in a user's lists.
    UserStocks,
    /// Current wiki content per symbol and section.
    CompanyWiki,
    /// Previous wiki versions.
    CompanyWikiHistory,
}

impl Table {
    /// Every table.
    pub const ALL: [Self; 10] = [
        Self::IncomeStatements,
        Self::BalanceSheets,
        Self::CashFlowStatements,
        Self::RevenueSegments,
        Self::RevenueGeoSegments,
        Self::StockPrices,
        Self::StockMetadata,
        Self::UserStocks,
        Self::CompanyWiki,
        Self::CompanyWikiHistory,
    ];

    /// Returns the table name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IncomeStatements => "income_statements",
            Self::BalanceSheets => "balance_sheets",
            Self::CashFlowStatements => "cash_flow_statements",
            Self::RevenueSegments => "revenue_segments",
            Self::RevenueGeoSegments => "revenue_geo_segments",
            Self::StockPrices => "stock_prices",
            Self::StockMetadata => "stock_metadata",
            Self::UserStocks => "user_stocks",
            Self::CompanyWiki => "company_wiki",
            Self::CompanyWikiHistory => "company_wiki_history",
        }
    }

    /// Columns forming the table's unique key.
    #[must_use]
    pub const fn unique_key(&self) -> &'static [&'static str] {
        match self {
            Self::IncomeStatements
            | Self::BalanceSheets
            | Self::CashFlowStatements
            | Self::RevenueSegments
            | Self::RevenueGeoSegments => &["symbol", "date", "period"],
            Self::StockPrices => &["symbol", "date"],
            Self::StockMetadata => &["symbol"],
            Self::UserStocks | Self::CompanyWikiHistory => &["id"],
            Self::CompanyWiki => &["symbol", "section"],
        }
    }

    /// Returns the table holding statements of the given kind.
    #[must_use]
    pub const fn for_statement(kind: StatementKind) -> Self {
        match kind {
            StatementKind::Income => Self::IncomeStatements,
            StatementKind::Balance => Self::BalanceSheets,
            StatementKind::CashFlow => Self::CashFlowStatements,
        }
    }

    /// Builds the unique-key string of a row.
    ///
    /// # Errors
    /// Returns [`FolioError::Database`] if a key column is missing or null.
    pub fn row_key(&self, row: &Row) -> Result<String> {
        let mut parts = Vec::with_capacity(self.unique_key().len());
        for column in self.unique_key() {
            match row.get(*column) {
                None | Some(Value::Null) => {
                    return Err(FolioError::Database(format!(
                        "{}: missing key column {column}",
                        self.name()
                    )));
                }
                Some(Value::String(s)) => parts.push(s.clone()),
                Some(other) => parts.push(other.to_string()),
            }
        }
        Ok(parts.join("|"))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| FolioError::Database(format!("Unknown table: {s}")))
    }
}

/// Sort direction for [`Query::order_by`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// Equality filters, ordering and limit applied to a table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    filters: Vec<(String, Value)>,
    order: Option<(String, Order)>,
    limit: Option<usize>,
}

impl Query {
    /// Creates a query matching every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `column == value`.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    /// Sorts the result by a column.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order = Some((column.into(), order));
        self
    }

    /// Caps the number of returned rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the value the query requires for a column, if any.
    #[must_use]
    pub fn filter_value(&self, column: &str) -> Option<&Value> {
        self.filters
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    /// Returns true if the row satisfies every filter.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(column, value)| row.get(column).is_some_and(|v| v == value))
    }

    /// Filters, sorts and truncates rows.
    #[must_use]
    pub fn apply(&self, rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
        let mut out: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).collect();
        if let Some((column, order)) = &self.order {
            out.sort_by(|a, b| {
                let ord = compare_values(a.get(column), b.get(column));
                match order {
                    Order::Ascending => ord,
                    Order::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

/// Total order over optional JSON scalars: missing and null first, then
/// booleans, numbers, strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Generic queryable store over named tables.
///
/// Implementations can keep rows in memory, in SQLite, or in a hosted
/// database; callers only rely on the semantics documented here.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Returns rows matching the query.
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>>;

    /// Inserts new rows.
    ///
    /// Fails with [`FolioError::Database`] if any row collides with an existing
    /// unique key; no row is written in that case.
    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<usize>;

    /// Merges `patch` into every row matching the query and returns the
    /// updated rows.
    async fn update(&self, table: Table, query: &Query, patch: Row) -> Result<Vec<Row>>;

    /// Inserts rows, replacing existing rows with the same unique key.
    ///
    /// Duplicate keys within the batch are resolved first-wins.
    async fn upsert(&self, table: Table, rows: Vec<Row>) -> Result<usize>;

    /// Deletes rows matching the query and returns how many were removed.
    async fn delete(&self, table: Table, query: &Query) -> Result<usize>;

    /// Removes rows written longer ago than `ttl`.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Removes every row of every table.
    async fn clear(&self) -> Result<()>;
}

/// Typed conveniences over any [`RecordStore`].
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    /// Selects rows and deserializes them.
    async fn select_as<T>(&self, table: Table, query: &Query) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let rows = self.select(table, query).await?;
        from_rows(rows)
    }

    /// Serializes items and upserts them.
    async fn upsert_all<T>(&self, table: Table, items: &[T]) -> Result<usize>
    where
        T: Serialize + Sync,
    {
        if items.is_empty() {
            return Ok(0);
        }
        let rows = to_rows(items)?;
        self.upsert(table, rows).await
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}

/// Serializes a single value into a row.
///
/// # Errors
/// Returns [`FolioError::Parse`] if the value is not a JSON object.
pub fn to_row<T: Serialize>(item: &T) -> Result<Row> {
    match serde_json::to_value(item)? {
        Value::Object(map) => Ok(map),
        other => Err(FolioError::Parse(format!("Expected a JSON object, got {other}"))),
    }
}

/// Serializes values into rows.
///
/// # Errors
/// Returns [`FolioError::Parse`] if any value is not a JSON object.
pub fn to_rows<T: Serialize>(items: &[T]) -> Result<Vec<Row>> {
    items.iter().map(to_row).collect()
}

/// Deserializes rows into values.
///
/// # Errors
/// Returns [`FolioError::Parse`] if any row does not match `T`.
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(FolioError::from))
        .collect()
}
