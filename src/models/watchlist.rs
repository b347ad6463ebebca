use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Hard cap on entries per user.
pub const MAX_WATCHLIST_ENTRIES: i64 = 5;

// ==============================================================================
// Watchlist Entry
// ==============================================================================

/// One tracked ticker for one user. The three prices are either all set (after
/// a successful fetch) or all absent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WatchlistEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub price_today: Option<f64>,
    pub price_previous_close: Option<f64>,
    pub price_year_ago: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl WatchlistEntry {
    pub fn snapshot(&self) -> Option<PriceSnapshot> {
        Some(PriceSnapshot {
            today: self.price_today?,
            yesterday: self.price_previous_close?,
            year_ago: self.price_year_ago?,
        })
    }
}

/// Today's, the previous trading day's and the year-ago close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSnapshot {
    pub today: f64,
    pub yesterday: f64,
    pub year_ago: f64,
}

impl PriceSnapshot {
    pub fn day_change_pct(&self) -> Option<f64> {
        pct_change(self.yesterday, self.today)
    }

    pub fn year_change_pct(&self) -> Option<f64> {
        pct_change(self.year_ago, self.today)
    }
}

fn pct_change(from: f64, to: f64) -> Option<f64> {
    if from > 0.0 {
        Some((to - from) / from * 100.0)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct NewWatchlistEntry {
    pub user_id: Uuid,
    pub symbol: String,
    pub refreshed_at: DateTime<Utc>,
    pub snapshot: PriceSnapshot,
}

/// A pending in-place update produced by a refresh pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedRefresh {
    pub entry_id: Uuid,
    pub refreshed_at: DateTime<Utc>,
    pub snapshot: PriceSnapshot,
}

// ==============================================================================
// Requests / Responses
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AddWatchlistEntryRequest {
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistEntryResponse {
    pub id: Uuid,
    pub symbol: String,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub price_today: Option<f64>,
    pub price_previous_close: Option<f64>,
    pub price_year_ago: Option<f64>,
    pub day_change_pct: Option<f64>,
    pub year_change_pct: Option<f64>,
}

impl From<WatchlistEntry> for WatchlistEntryResponse {
    fn from(entry: WatchlistEntry) -> Self {
        let snapshot = entry.snapshot();
        Self {
            id: entry.id,
            symbol: entry.symbol,
            last_refreshed_at: entry.last_refreshed_at,
            price_today: entry.price_today,
            price_previous_close: entry.price_previous_close,
            price_year_ago: entry.price_year_ago,
            day_change_pct: snapshot.and_then(|s| s.day_change_pct()),
            year_change_pct: snapshot.and_then(|s| s.year_change_pct()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRefresh {
    pub symbol: String,
    pub reason: String,
}

/// What one refresh pass did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshSummary {
    pub stale: usize,
    pub refreshed: Vec<String>,
    pub skipped: Vec<SkippedRefresh>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistResponse {
    pub entries: Vec<WatchlistEntryResponse>,
    pub refresh: RefreshSummary,
}
