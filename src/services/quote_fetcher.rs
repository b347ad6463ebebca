use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::AppError;
use crate::external::quote_provider::{
    CompanyOverview, FetchError, FetchOutcome, OutputSize, QuoteProvider, SeriesKind, TimeSeries,
};
use crate::services::failure_cache::FailureCache;
use crate::services::rate_limiter::RateLimiter;

const MAX_SYMBOL_LEN: usize = 10;

/// Trims and uppercases a user-supplied ticker. Returns `None` for anything
/// that cannot be a ticker (empty, too long, or odd characters).
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_ascii_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    valid.then_some(symbol)
}

/// The entry point services use to reach the market-data provider.
///
/// Calls go through the shared [`RateLimiter`] one at a time and consult the
/// [`FailureCache`] first, so a known-bad symbol or an exhausted quota costs
/// no request. Nothing here retries.
#[derive(Clone)]
pub struct QuoteFetcher {
    provider: Arc<dyn QuoteProvider>,
    limiter: Arc<RateLimiter>,
    failures: FailureCache,
}

impl QuoteFetcher {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        limiter: Arc<RateLimiter>,
        failures: FailureCache,
    ) -> Self {
        Self {
            provider,
            limiter,
            failures,
        }
    }

    pub fn failures(&self) -> &FailureCache {
        &self.failures
    }

    pub async fn overview(&self, symbol: &str) -> FetchOutcome<CompanyOverview> {
        let symbol = symbol.trim().to_ascii_uppercase();

        if self.failures.is_invalid_symbol(&symbol) {
            info!("⚠️ Skipping overview for {} - known invalid symbol", symbol);
            return Err(FetchError::InvalidSymbol);
        }
        self.check_quota(&symbol)?;

        let outcome = {
            let _slot = self.limiter.acquire().await;
            self.provider.fetch_overview(&symbol).await
        };

        match &outcome {
            Ok(_) => self.failures.clear(&symbol),
            Err(FetchError::InvalidSymbol) => self.failures.record_invalid_symbol(&symbol),
            Err(e) => self.note_failure(&symbol, e),
        }
        outcome
    }

    pub async fn series(
        &self,
        symbol: &str,
        kind: SeriesKind,
        size: OutputSize,
    ) -> FetchOutcome<TimeSeries> {
        let symbol = symbol.trim().to_ascii_uppercase();
        self.check_quota(&symbol)?;

        let outcome = {
            let _slot = self.limiter.acquire().await;
            self.provider.fetch_series(&symbol, kind, size).await
        };

        if let Err(e) = &outcome {
            self.note_failure(&symbol, e);
        }
        outcome
    }

    /// Maps a fetch failure for `symbol` to the error returned to the caller.
    /// A rate limit carries the time left on the quota cooldown.
    pub fn error_for(&self, symbol: &str, err: FetchError) -> AppError {
        match (err, self.failures.quota_retry_after()) {
            (FetchError::RateLimited, Some(left)) => AppError::RateLimited {
                retry_after_secs: left.as_secs().max(1),
            },
            (err, _) => AppError::from_fetch(symbol, err),
        }
    }

    fn check_quota(&self, symbol: &str) -> FetchOutcome<()> {
        if self.failures.quota_exhausted() {
            info!("⚠️ Skipping provider call for {} - quota cooldown active", symbol);
            return Err(FetchError::RateLimited);
        }
        Ok(())
    }

    fn note_failure(&self, symbol: &str, err: &FetchError) {
        match err {
            FetchError::RateLimited => {
                warn!("Provider quota exhausted while fetching {}", symbol);
                self.failures.record_quota_exhausted();
            }
            other => warn!("Provider call for {} failed: {}", symbol, other),
        }
    }
}
