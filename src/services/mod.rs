pub mod failure_cache;
pub mod lookup_service;
pub mod quote_fetcher;
pub mod rate_limiter;
pub mod trading_calendar;
pub mod watchlist_service;
