use chrono::{DateTime, FixedOffset, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::external::quote_provider::{OutputSize, SeriesKind};
use crate::models::*;
use crate::services::quote_fetcher::{normalize_symbol, QuoteFetcher};
use crate::services::trading_calendar::{is_refresh_due, resolve_price_snapshot};
use crate::store::WatchlistStore;

// ==============================================================================
// Refresh
// ==============================================================================

/// Brings every stale entry of `user_id` up to date.
///
/// Entries are fetched one after another. A symbol that fails to fetch or
/// resolve keeps its previous prices and does not affect the others; the
/// successful updates are written together in one transaction at the end. No
/// stale entries means no fetch and no write.
pub async fn refresh_watchlist(
    store: &dyn WatchlistStore,
    fetcher: &QuoteFetcher,
    user_id: Uuid,
    now: DateTime<FixedOffset>,
) -> Result<RefreshSummary, AppError> {
    let entries = store.list_entries(user_id).await?;
    let stale: Vec<WatchlistEntry> = entries
        .into_iter()
        .filter(|e| is_refresh_due(e.last_refreshed_at, now))
        .collect();

    let mut summary = RefreshSummary {
        stale: stale.len(),
        ..Default::default()
    };

    if stale.is_empty() {
        return Ok(summary);
    }

    info!("🔄 Refreshing {} stale watchlist entries for user {}", stale.len(), user_id);

    let today = now.date_naive();
    let refreshed_at = now.with_timezone(&Utc);
    let mut staged = Vec::with_capacity(stale.len());

    for entry in &stale {
        let series = match fetcher
            .series(&entry.symbol, SeriesKind::Daily, OutputSize::Full)
            .await
        {
            Ok(series) => series,
            Err(e) => {
                warn!("⚠️ Skipping refresh of {}: {}", entry.symbol, e);
                summary.skipped.push(SkippedRefresh {
                    symbol: entry.symbol.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match resolve_price_snapshot(&series, today) {
            Ok(snapshot) => {
                staged.push(StagedRefresh {
                    entry_id: entry.id,
                    refreshed_at,
                    snapshot,
                });
                summary.refreshed.push(entry.symbol.clone());
            }
            Err(e) => {
                warn!("⚠️ Skipping refresh of {}: {}", entry.symbol, e);
                summary.skipped.push(SkippedRefresh {
                    symbol: entry.symbol.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if !staged.is_empty() {
        store.apply_refreshes(&staged).await.map_err(|e| {
            error!("Failed to commit {} watchlist refreshes: {}", staged.len(), e);
            AppError::Db(e)
        })?;
    }

    info!(
        "✅ Watchlist refresh for user {}: {} refreshed, {} skipped",
        user_id,
        summary.refreshed.len(),
        summary.skipped.len()
    );

    Ok(summary)
}

/// Refreshes, then returns the user's entries (the dashboard view).
pub async fn load_watchlist(
    store: &dyn WatchlistStore,
    fetcher: &QuoteFetcher,
    user_id: Uuid,
    now: DateTime<FixedOffset>,
) -> Result<WatchlistResponse, AppError> {
    let refresh = refresh_watchlist(store, fetcher, user_id, now).await?;
    let entries = store.list_entries(user_id).await?;

    Ok(WatchlistResponse {
        entries: entries.into_iter().map(WatchlistEntryResponse::from).collect(),
        refresh,
    })
}

// ==============================================================================
// Add / Remove
// ==============================================================================

/// Adds `raw_symbol` to the user's watchlist.
///
/// Checks run in order and stop at the first failure, leaving the store
/// untouched: capacity, duplicate symbol, company overview, then a full daily
/// series that resolves to a price snapshot. A full or duplicate request makes
/// no provider call.
pub async fn add_to_watchlist(
    store: &dyn WatchlistStore,
    fetcher: &QuoteFetcher,
    user_id: Uuid,
    raw_symbol: &str,
    now: DateTime<FixedOffset>,
) -> Result<WatchlistEntry, AppError> {
    let symbol = normalize_symbol(raw_symbol)
        .ok_or_else(|| AppError::Validation(format!("'{}' is not a ticker symbol", raw_symbol.trim())))?;

    if store.count_entries(user_id).await? >= MAX_WATCHLIST_ENTRIES {
        return Err(AppError::WatchlistFull);
    }

    if store.find_entry_by_symbol(user_id, &symbol).await?.is_some() {
        return Err(AppError::DuplicateSymbol(symbol));
    }

    let overview = fetcher
        .overview(&symbol)
        .await
        .map_err(|e| fetcher.error_for(&symbol, e))?;

    info!("➕ Adding {} ({}) to watchlist of user {}", symbol, overview.name, user_id);

    let series = fetcher
        .series(&symbol, SeriesKind::Daily, OutputSize::Full)
        .await
        .map_err(|e| fetcher.error_for(&symbol, e))?;

    let snapshot = resolve_price_snapshot(&series, now.date_naive()).map_err(|source| {
        AppError::ResolutionFailed {
            symbol: symbol.clone(),
            source,
        }
    })?;

    let new_entry = NewWatchlistEntry {
        user_id,
        symbol: symbol.clone(),
        refreshed_at: now.with_timezone(&Utc),
        snapshot,
    };

    match store.insert_entry(&new_entry).await {
        Ok(Some(entry)) => Ok(entry),
        Ok(None) => Err(AppError::WatchlistFull),
        Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateSymbol(symbol)),
        Err(e) => {
            error!("Failed to insert watchlist entry {} for user {}: {}", symbol, user_id, e);
            Err(AppError::Db(e))
        }
    }
}

pub async fn remove_from_watchlist(
    store: &dyn WatchlistStore,
    user_id: Uuid,
    entry_id: Uuid,
) -> Result<(), AppError> {
    if store.delete_entry(user_id, entry_id).await? {
        info!("🗑️ Removed watchlist entry {} for user {}", entry_id, user_id);
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_database_errors_can_be_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
