use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;

use crate::external::quote_provider::FetchError;
use crate::services::failure_cache::QUOTA_COOLDOWN_HOURS;
use crate::services::trading_calendar::ResolutionError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found")]
    NotFound,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Rate limited by market data provider, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
    #[error("No data for {symbol}: {detail}")]
    NoData { symbol: String, detail: String },
    #[error("Market data provider unavailable: {0}")]
    Transient(String),
    #[error("Watchlist is full")]
    WatchlistFull,
    #[error("{0} is already in the watchlist")]
    DuplicateSymbol(String),
    #[error("Not enough history for {symbol}: {source}")]
    ResolutionFailed {
        symbol: String,
        source: ResolutionError,
    },
}

impl AppError {
    /// Maps a classified provider failure for `symbol`. A rate limit is
    /// reported with the full quota cooldown; `QuoteFetcher::error_for` narrows
    /// it to the time actually left.
    pub fn from_fetch(symbol: &str, err: FetchError) -> Self {
        match err {
            FetchError::RateLimited => AppError::RateLimited {
                retry_after_secs: (QUOTA_COOLDOWN_HOURS * 3600) as u64,
            },
            FetchError::InvalidSymbol => AppError::InvalidSymbol(symbol.to_string()),
            FetchError::NoData(detail) => AppError::NoData {
                symbol: symbol.to_string(),
                detail,
            },
            FetchError::Transient(msg) => AppError::Transient(msg),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidSymbol(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ResolutionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NoData { .. } | AppError::Transient(_) => StatusCode::BAD_GATEWAY,
            AppError::WatchlistFull | AppError::DuplicateSymbol(_) => StatusCode::CONFLICT,
        }
    }

    /// Text shown to the end user. Never includes provider or database internals.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Db(_) => "Internal server error".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound => "Not found".to_string(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::RateLimited { .. } => {
                "You've hit the market data API call limit. Please try again later.".to_string()
            }
            AppError::InvalidSymbol(symbol) => format!("'{}' is not a valid stock symbol.", symbol),
            AppError::NoData { symbol, .. } => {
                format!("Could not retrieve price data for {}.", symbol)
            }
            AppError::Transient(_) => {
                "The market data provider could not be reached. Please try again.".to_string()
            }
            AppError::WatchlistFull => format!(
                "Sorry, we only allow {} stocks in your watchlist.",
                crate::models::MAX_WATCHLIST_ENTRIES
            ),
            AppError::DuplicateSymbol(symbol) => format!("{} is already in your watchlist.", symbol),
            AppError::ResolutionFailed { symbol, .. } => {
                format!("Not enough price history to track {}.", symbol)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = self.user_message();
        match self {
            AppError::RateLimited { retry_after_secs } => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from(retry_after_secs));
                (status, headers, message).into_response()
            }
            _ => (status, message).into_response(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_errors_map_to_distinct_variants() {
        assert!(matches!(
            AppError::from_fetch("IBM", FetchError::RateLimited),
            AppError::RateLimited { retry_after_secs: 3600 }
        ));
        assert!(matches!(
            AppError::from_fetch("ZZZZ", FetchError::InvalidSymbol),
            AppError::InvalidSymbol(s) if s == "ZZZZ"
        ));
        assert!(matches!(
            AppError::from_fetch("IBM", FetchError::NoData("empty".into())),
            AppError::NoData { .. }
        ));
        assert!(matches!(
            AppError::from_fetch("IBM", FetchError::Transient("timeout".into())),
            AppError::Transient(_)
        ));
    }

    #[test]
    fn test_statuses() {
        assert_eq!(AppError::WatchlistFull.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::DuplicateSymbol("IBM".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::RateLimited { retry_after_secs: 30 }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::InvalidSymbol("ZZZZ".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::Db(sqlx::Error::RowNotFound).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limited_response_has_retry_after() {
        let response = AppError::RateLimited { retry_after_secs: 3539 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "3539");
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let msg = AppError::Db(sqlx::Error::RowNotFound).user_message();
        assert_eq!(msg, "Internal server error");

        let msg = AppError::Transient("connection refused at 10.0.0.1".into()).user_message();
        assert!(!msg.contains("10.0.0.1"));

        assert_eq!(
            AppError::WatchlistFull.user_message(),
            "Sorry, we only allow 5 stocks in your watchlist."
        );
    }
}
