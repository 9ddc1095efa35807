//! Services over the record store and the upstream providers.

mod financials;
mod lists;
mod prices;
mod reference;
mod wiki;

#[cfg(test)]
pub(crate) mod testing;

pub use financials::FinancialDataService;
pub use lists::{ListName, StockListService, UserStock};
pub use prices::PriceService;
pub use reference::ReferenceService;
pub use wiki::{HISTORY_LIMIT, WikiEntry, WikiHistoryEntry, WikiService};
