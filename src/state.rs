use std::sync::Arc;
use crate::services::quote_fetcher::QuoteFetcher;
use crate::store::WatchlistStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn WatchlistStore>,
    pub quotes: QuoteFetcher,
}
