use chrono::{DateTime, Utc};
use folio_core::{FolioError, Order, Query, RecordStore, RecordStoreExt, Result, Symbol, Table};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Number of previous versions kept per section.
pub const HISTORY_LIMIT: usize = 5;

/// Current wiki content of one company section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiEntry {
    /// Row id, `SYMBOL:section`.
    pub id: String,
    /// Company.
    pub symbol: Symbol,
    /// Section name.
    pub section: String,
    /// Markdown content.
    pub content: String,
    /// Author of this version.
    pub user_id: String,
    /// When this version was written.
    pub updated_at: DateTime<Utc>,
    /// Increments on every save.
    #[serde(default)]
    pub version: u64,
}

/// A superseded wiki version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiHistoryEntry {
    /// Row id, `wiki_id@version`.
    pub id: String,
    /// Entry this version belonged to.
    pub wiki_id: String,
    /// Company.
    pub symbol: Symbol,
    /// Section name.
    pub section: String,
    /// Markdown content.
    pub content: String,
    /// Author of this version.
    pub user_id: String,
    /// When this version was written.
    pub updated_at: DateTime<Utc>,
    /// Version number of the superseded entry.
    pub version: u64,
}

impl WikiHistoryEntry {
    fn of(entry: &WikiEntry) -> Self {
        Self {
            id: format!("{}@{}", entry.id, entry.version),
            wiki_id: entry.id.clone(),
            symbol: entry.symbol.clone(),
            section: entry.section.clone(),
            content: entry.content.clone(),
            user_id: entry.user_id.clone(),
            updated_at: entry.updated_at,
            version: entry.version,
        }
    }
}

/// Per-company notes with a short version history.
#[derive(Clone)]
pub struct WikiService {
    store: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for WikiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WikiService").finish_non_exhaustive()
    }
}

fn section_query(symbol: &Symbol, section: &str) -> Query {
    Query::new()
        .eq("symbol", symbol.as_str())
        .eq("section", section)
}

fn require_user(user_id: Option<&str>) -> Result<&str> {
    user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or(FolioError::Unauthorized)
}

impl WikiService {
    /// Creates the service.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Current content of a section, if any.
    ///
    /// # Errors
    /// Returns the store error.
    pub async fn load(&self, symbol: &Symbol, section: &str) -> Result<Option<WikiEntry>> {
        let entries: Vec<WikiEntry> = self
            .store
            .select_as(Table::CompanyWiki, &section_query(symbol, section).limit(1))
            .await?;
        Ok(entries.into_iter().next())
    }

    /// Previous versions of a section, newest first.
    ///
    /// # Errors
    /// Returns the store error.
    pub async fn history(&self, symbol: &Symbol, section: &str) -> Result<Vec<WikiHistoryEntry>> {
        let query = section_query(symbol, section).order_by("version", Order::Descending);
        self.store.select_as(Table::CompanyWikiHistory, &query).await
    }

    /// Saves new content, moving the current version into the history and
    /// keeping only the newest [`HISTORY_LIMIT`] versions there.
    ///
    /// # Errors
    /// Returns [`FolioError::Unauthorized`] without a user, or the store
    /// error.
    #[instrument(skip(self, content), fields(symbol = %symbol))]
    pub async fn save(
        &self,
        symbol: &Symbol,
        section: &str,
        content: &str,
        user_id: Option<&str>,
    ) -> Result<WikiEntry> {
        let user_id = require_user(user_id)?;
        let current = self.load(symbol, section).await?;

        let version = match &current {
            Some(current) => {
                self.store
                    .upsert_all(Table::CompanyWikiHistory, &[WikiHistoryEntry::of(current)])
                    .await?;
                self.prune_history(symbol, section).await?;
                current.version + 1
            }
            None => 1,
        };

        let entry = WikiEntry {
            id: format!("{symbol}:{section}"),
            symbol: symbol.clone(),
            section: section.to_string(),
            content: content.to_string(),
            user_id: user_id.to_string(),
            updated_at: Utc::now(),
            version,
        };
        self.store
            .upsert_all(Table::CompanyWiki, std::slice::from_ref(&entry))
            .await?;
        Ok(entry)
    }

    async fn prune_history(&self, symbol: &Symbol, section: &str) -> Result<usize> {
        let mut removed = 0;
        for stale in self.history(symbol, section).await?.into_iter().skip(HISTORY_LIMIT) {
            removed += self
                .store
                .delete(Table::CompanyWikiHistory, &Query::new().eq("id", stale.id))
                .await?;
        }
        if removed > 0 {
            debug!(removed, "Pruned wiki history");
        }
        Ok(removed)
    }

    /// Replaces the current content with an earlier version without
    /// recording a history entry.
    ///
    /// # Errors
    /// Returns [`FolioError::Unauthorized`] without a user,
    /// [`FolioError::SymbolNotFound`] if the section has no content yet, or
    /// the store error.
    #[instrument(skip(self, content), fields(symbol = %symbol))]
    pub async fn revert(
        &self,
        symbol: &Symbol,
        section: &str,
        content: &str,
        user_id: Option<&str>,
    ) -> Result<WikiEntry> {
        let user_id = require_user(user_id)?;
        let patch = json!({ "content": content, "user_id": user_id, "updated_at": Utc::now() });
        let patch = patch.as_object().cloned().unwrap_or_default();
        let updated = self
            .store
            .update(Table::CompanyWiki, &section_query(symbol, section), patch)
            .await?;
        folio_core::store::from_rows(updated)?
            .into_iter()
            .next()
            .ok_or_else(|| FolioError::SymbolNotFound(format!("No wiki content for {symbol}/{section}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_store::InMemoryStore;

    #[tokio::test]
    async fn test_save_requires_user() {
        let wiki = WikiService::new(Arc::new(InMemoryStore::new()));
        let symbol = Symbol::new("ACME");
        assert_eq!(
            wiki.save(&symbol, "thesis", "x", None).await,
            Err(FolioError::Unauthorized)
        );
        assert_eq!(
            wiki.revert(&symbol, "thesis", "x", Some(" ")).await,
            Err(FolioError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_history_keeps_five_newest() {
        let wiki = WikiService::new(Arc::new(InMemoryStore::new()));
        let symbol = Symbol::new("ACME");
        for i in 1..=8 {
            wiki.save(&symbol, "thesis", &format!("v{i}"), Some("u1")).await.unwrap();
        }

        let current = wiki.load(&symbol, "thesis").await.unwrap().unwrap();
        assert_eq!(current.content, "v8");
        assert_eq!(current.version, 8);

        let history = wiki.history(&symbol, "thesis").await.unwrap();
        let contents: Vec<&str> = history.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(contents, vec!["v7", "v6", "v5", "v4", "v3"]);
        assert!(wiki.history(&symbol, "risks").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revert_restores_content() {
        let wiki = WikiService::new(Arc::new(InMemoryStore::new()));
        let symbol = Symbol::new("ACME");
        assert!(matches!(
            wiki.revert(&symbol, "thesis", "old", Some("u1")).await,
            Err(FolioError::SymbolNotFound(_))
        ));

        wiki.save(&symbol, "thesis", "first", Some("u1")).await.unwrap();
        wiki.save(&symbol, "thesis", "second", Some("u2")).await.unwrap();
        let old = wiki.history(&symbol, "thesis").await.unwrap().remove(0);

        let reverted = wiki
            .revert(&symbol, "thesis", &old.content, Some("u3"))
            .await
            .unwrap();
        assert_eq!(reverted.content, "first");
        assert_eq!(reverted.user_id, "u3");
        assert_eq!(wiki.history(&symbol, "thesis").await.unwrap().len(), 1);
    }
}
