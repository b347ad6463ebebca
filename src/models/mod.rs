pub mod lookup;
pub mod user;
pub mod watchlist;

pub use lookup::{ChartData, LookupParams};
pub use user::User;
pub use watchlist::{
    AddWatchlistEntryRequest, NewWatchlistEntry, PriceSnapshot, RefreshSummary, SkippedRefresh,
    StagedRefresh, WatchlistEntry, WatchlistEntryResponse, WatchlistResponse,
    MAX_WATCHLIST_ENTRIES,
};
