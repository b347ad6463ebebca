use crate::models::watchlist::*;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

// ==============================================================================
// Watchlist Entry Reads
// ==============================================================================

pub async fn get_entries_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<WatchlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistEntry>(
        r#"
        SELECT * FROM watchlist_entries
        WHERE user_id = $1
        ORDER BY created_at ASC, symbol ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn count_entries(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM watchlist_entries WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn get_entry_by_symbol(
    pool: &PgPool,
    user_id: Uuid,
    symbol: &str,
) -> Result<Option<WatchlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistEntry>(
        "SELECT * FROM watchlist_entries WHERE user_id = $1 AND symbol = $2",
    )
    .bind(user_id)
    .bind(symbol)
    .fetch_optional(pool)
    .await
}

// ==============================================================================
// Watchlist Entry Writes
// ==============================================================================

/// Inserts a fully priced entry while the user is below
/// `MAX_WATCHLIST_ENTRIES`; `None` means the cap was already reached.
///
/// The user's row is locked for the duration of the count and insert, so
/// concurrent adds for the same user run one after another.
pub async fn insert_entry(
    pool: &PgPool,
    entry: &NewWatchlistEntry,
) -> Result<Option<WatchlistEntry>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT 1 FROM users WHERE id = $1 FOR UPDATE")
        .bind(entry.user_id)
        .execute(&mut *tx)
        .await?;

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM watchlist_entries WHERE user_id = $1",
    )
    .bind(entry.user_id)
    .fetch_one(&mut *tx)
    .await?;

    if count >= MAX_WATCHLIST_ENTRIES {
        tx.rollback().await?;
        return Ok(None);
    }

    let inserted = sqlx::query_as::<_, WatchlistEntry>(
        r#"
        INSERT INTO watchlist_entries
            (id, user_id, symbol, last_refreshed_at, price_today, price_previous_close, price_year_ago)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(&entry.symbol)
    .bind(entry.refreshed_at)
    .bind(entry.snapshot.today)
    .bind(entry.snapshot.yesterday)
    .bind(entry.snapshot.year_ago)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(inserted))
}

async fn apply_refresh(
    tx: &mut Transaction<'_, Postgres>,
    refresh: &StagedRefresh,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE watchlist_entries
        SET last_refreshed_at = $2,
            price_today = $3,
            price_previous_close = $4,
            price_year_ago = $5
        WHERE id = $1
        "#,
    )
    .bind(refresh.entry_id)
    .bind(refresh.refreshed_at)
    .bind(refresh.snapshot.today)
    .bind(refresh.snapshot.yesterday)
    .bind(refresh.snapshot.year_ago)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

/// Applies every staged refresh in one transaction: all rows or none.
pub async fn apply_refreshes(
    pool: &PgPool,
    refreshes: &[StagedRefresh],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let mut updated = 0;
    for refresh in refreshes {
        updated += apply_refresh(&mut tx, refresh).await?;
    }

    tx.commit().await?;
    Ok(updated)
}

pub async fn delete_entry(
    pool: &PgPool,
    user_id: Uuid,
    entry_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watchlist_entries WHERE id = $1 AND user_id = $2")
        .bind(entry_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
