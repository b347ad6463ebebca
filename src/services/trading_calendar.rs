use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use thiserror::Error;

use crate::external::quote_provider::TimeSeries;
use crate::models::PriceSnapshot;

/// Calendar days between "today" and the year-ago comparison date.
pub const YEAR_AGO_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("series has {found} dated entries, need at least 2")]
    InsufficientHistory { found: usize },

    #[error("no trading day on or before {target} (series starts {earliest:?})")]
    NoTradingDay {
        target: NaiveDate,
        earliest: Option<NaiveDate>,
    },
}

/// A dated close taken from a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradingDay {
    pub date: NaiveDate,
    pub close: f64,
}

// ==============================================================================
// Staleness
// ==============================================================================

/// An entry is due once per calendar day in the server's offset: when it has
/// never been refreshed, or its last refresh fell on a different local date.
pub fn is_refresh_due(last_refreshed_at: Option<DateTime<Utc>>, now: DateTime<FixedOffset>) -> bool {
    match last_refreshed_at {
        None => true,
        Some(at) => at.with_timezone(now.offset()).date_naive() != now.date_naive(),
    }
}

// ==============================================================================
// Trading-Day Resolution
// ==============================================================================

/// Resolves `target` to the closest trading day at or before it.
///
/// Equivalent to stepping back one calendar day at a time until a dated entry
/// is hit, but the walk stops at the earliest entry: a target that predates the
/// whole series is an error rather than an endless search.
pub fn resolve_closest_trading_day(
    series: &TimeSeries,
    target: NaiveDate,
) -> Result<TradingDay, ResolutionError> {
    if let Some(close) = series.get(target) {
        return Ok(TradingDay { date: target, close });
    }

    series
        .on_or_before(target)
        .map(|(date, close)| TradingDay { date, close })
        .ok_or_else(|| ResolutionError::NoTradingDay {
            target,
            earliest: series.earliest().map(|(date, _)| date),
        })
}

/// "Today" and "yesterday" are the two newest trading days in the series, so
/// on a Saturday they are Friday and Thursday. "Year ago" is the closest
/// trading day at or before `today - 365 days`.
pub fn resolve_price_snapshot(
    series: &TimeSeries,
    today: NaiveDate,
) -> Result<PriceSnapshot, ResolutionError> {
    let mut newest = series.iter_desc();
    let (latest, previous) = match (newest.next(), newest.next()) {
        (Some(latest), Some(previous)) => (latest, previous),
        _ => {
            return Err(ResolutionError::InsufficientHistory {
                found: series.len(),
            })
        }
    };

    let year_ago = resolve_closest_trading_day(series, today - Duration::days(YEAR_AGO_DAYS))?;

    Ok(PriceSnapshot {
        today: latest.1,
        yesterday: previous.1,
        year_ago: year_ago.close,
    })
}
