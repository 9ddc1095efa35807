use chrono::{DateTime, Utc};
use folio_core::{
    FolioError, Order, Query, RecordStore, RecordStoreExt, Result, Symbol, Table, store::from_rows,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

/// The lists a stock can sit in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ListName {
    /// Candidates worth following.
    Watchlist,
    /// Under research.
    #[serde(rename = "Due Diligence")]
    DueDiligence,
    /// Researched and waiting for a price.
    #[serde(rename = "Buy Ready")]
    BuyReady,
    /// Good business, bad price.
    #[serde(rename = "Too Expensive")]
    TooExpensive,
    /// Parked.
    #[serde(rename = "Pass For Now")]
    PassForNow,
    /// Rejected for good.
    #[serde(rename = "Permanent Pass")]
    PermanentPass,
    /// Owned.
    #[serde(rename = "Core Holdings")]
    CoreHoldings,
    /// Owned, thesis under review.
    #[serde(rename = "Regular Review")]
    RegularReview,
    /// Owned, to be sold.
    #[serde(rename = "Sell Ready")]
    SellReady,
    /// No longer owned.
    Sold,
}

impl ListName {
    /// Every list, in display order.
    pub const ALL: [Self; 10] = [
        Self::Watchlist,
        Self::DueDiligence,
        Self::BuyReady,
        Self::TooExpensive,
        Self::PassForNow,
        Self::PermanentPass,
        Self::CoreHoldings,
        Self::RegularReview,
        Self::SellReady,
        Self::Sold,
    ];

    /// Display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Watchlist => "Watchlist",
            Self::DueDiligence => "Due Diligence",
            Self::BuyReady => "Buy Ready",
            Self::TooExpensive => "Too Expensive",
            Self::PassForNow => "Pass For Now",
            Self::PermanentPass => "Permanent Pass",
            Self::CoreHoldings => "Core Holdings",
            Self::RegularReview => "Regular Review",
            Self::SellReady => "Sell Ready",
            Self::Sold => "Sold",
        }
    }

    /// Lists a stock in this list may move to.
    #[must_use]
    pub const fn allowed_moves(&self) -> &'static [Self] {
        use ListName::*;
        match self {
            Watchlist => &[DueDiligence, TooExpensive, PassForNow, PermanentPass],
            DueDiligence => &[BuyReady, TooExpensive, PassForNow, PermanentPass],
            BuyReady => &[CoreHoldings, TooExpensive, PassForNow, PermanentPass],
            CoreHoldings => &[RegularReview, SellReady, TooExpensive, PassForNow, PermanentPass],
            RegularReview => &[SellReady, CoreHoldings, TooExpensive, PassForNow, PermanentPass],
            SellReady => &[Sold, RegularReview, TooExpensive, PassForNow, PermanentPass],
            Sold => &[TooExpensive, PassForNow, PermanentPass],
            TooExpensive => &[PassForNow, PermanentPass],
            PassForNow => &[DueDiligence, PermanentPass],
            PermanentPass => &[],
        }
    }

    /// Returns true if a stock may move from this list to `to`.
    #[must_use]
    pub fn can_move_to(&self, to: Self) -> bool {
        self.allowed_moves().contains(&to)
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListName {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FolioError::InvalidParameter(format!("Unknown list: {s}")))
    }
}

/// A stock placed in one of a user's lists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserStock {
    /// Row id.
    pub id: String,
    /// Owner.
    pub user_id: String,
    /// Stock symbol.
    pub symbol: Symbol,
    /// Current list.
    pub list_name: ListName,
    /// Last move.
    pub updated_at: DateTime<Utc>,
}

/// A user's stock lists.
#[derive(Clone)]
pub struct StockListService {
    store: Arc<dyn RecordStore>,
}

impl fmt::Debug for StockListService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StockListService").finish_non_exhaustive()
    }
}

impl StockListService {
    /// Creates the service.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Adds a stock to a list, or returns the existing entry.
    ///
    /// # Errors
    /// Returns the store error.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn add_stock(&self, user_id: &str, symbol: &Symbol, list: ListName) -> Result<UserStock> {
        let id = format!("{user_id}:{symbol}");
        let query = Query::new().eq("id", id.as_str()).limit(1);
        let existing: Vec<UserStock> = self.store.select_as(Table::UserStocks, &query).await?;
        if let Some(stock) = existing.into_iter().next() {
            return Ok(stock);
        }
        let stock = UserStock {
            id,
            user_id: user_id.to_string(),
            symbol: symbol.clone(),
            list_name: list,
            updated_at: Utc::now(),
        };
        self.store
            .upsert_all(Table::UserStocks, std::slice::from_ref(&stock))
            .await?;
        Ok(stock)
    }

    /// Stocks of a user, optionally restricted to one list, by symbol.
    ///
    /// # Errors
    /// Returns the store error.
    pub async fn stocks(&self, user_id: &str, list: Option<ListName>) -> Result<Vec<UserStock>> {
        let mut query = Query::new().eq("user_id", user_id);
        if let Some(list) = list {
            query = query.eq("list_name", list.as_str());
        }
        self.store
            .select_as(Table::UserStocks, &query.order_by("symbol", Order::Ascending))
            .await
    }

    /// Moves one of the user's stocks to another list.
    ///
    /// # Errors
    /// Returns [`FolioError::SymbolNotFound`] if the user owns no stock with
    /// that id, [`FolioError::InvalidParameter`] if the move is not allowed,
    /// or the store error.
    #[instrument(skip(self))]
    pub async fn move_stock(&self, user_id: &str, stock_id: &str, new_list: ListName) -> Result<UserStock> {
        let query = Query::new().eq("id", stock_id).eq("user_id", user_id);
        let current: Vec<UserStock> = self.store.select_as(Table::UserStocks, &query).await?;
        let Some(current) = current.into_iter().next() else {
            return Err(FolioError::SymbolNotFound("Stock not found".into()));
        };
        if !current.list_name.can_move_to(new_list) {
            return Err(FolioError::InvalidParameter(format!(
                "Cannot move from {} to {new_list}",
                current.list_name
            )));
        }

        let patch = json!({ "list_name": new_list, "updated_at": Utc::now() });
        let patch = patch.as_object().cloned().unwrap_or_default();
        let updated = from_rows(self.store.update(Table::UserStocks, &query, patch).await?)?;
        let stock: UserStock = updated
            .into_iter()
            .next()
            .ok_or_else(|| FolioError::SymbolNotFound("Stock not found".into()))?;
        info!(symbol = %stock.symbol, from = %current.list_name, to = %new_list, "Moved stock");
        Ok(stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_store::InMemoryStore;
    use rstest::rstest;

    #[rstest]
    #[case(ListName::Watchlist, ListName::DueDiligence, true)]
    #[case(ListName::Watchlist, ListName::BuyReady, false)]
    #[case(ListName::SellReady, ListName::Sold, true)]
    #[case(ListName::PassForNow, ListName::DueDiligence, true)]
    #[case(ListName::PermanentPass, ListName::Watchlist, false)]
    fn test_allowed_moves(#[case] from: ListName, #[case] to: ListName, #[case] allowed: bool) {
        assert_eq!(from.can_move_to(to), allowed);
    }

    #[test]
    fn test_names_round_trip() {
        for list in ListName::ALL {
            assert_eq!(list.as_str().parse::<ListName>().unwrap(), list);
            assert_eq!(serde_json::to_value(list).unwrap(), json!(list.as_str()));
        }
        assert!(ListName::PermanentPass.allowed_moves().is_empty());
    }

    #[tokio::test]
    async fn test_move_stock() {
        let service = StockListService::new(Arc::new(InMemoryStore::new()));
        let stock = service
            .add_stock("u1", &Symbol::new("ACME"), ListName::Watchlist)
            .await
            .unwrap();

        let moved = service
            .move_stock("u1", &stock.id, ListName::DueDiligence)
            .await
            .unwrap();
        assert_eq!(moved.list_name, ListName::DueDiligence);
        assert_eq!(moved.symbol, Symbol::new("ACME"));

        let listed = service.stocks("u1", Some(ListName::DueDiligence)).await.unwrap();
        assert_eq!(listed.len(), 1);

        let illegal = service.move_stock("u1", &stock.id, ListName::Sold).await;
        assert!(matches!(illegal, Err(FolioError::InvalidParameter(_))));

        let foreign = service.move_stock("u2", &stock.id, ListName::BuyReady).await;
        assert!(matches!(foreign, Err(FolioError::SymbolNotFound(_))));
    }
}
