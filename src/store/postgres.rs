use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{user_queries, watchlist_queries};
use crate::models::{NewWatchlistEntry, StagedRefresh, User, WatchlistEntry};
use crate::store::WatchlistStore;

#[derive(Clone)]
pub struct PgWatchlistStore {
    pool: PgPool,
}

impl PgWatchlistStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatchlistStore for PgWatchlistStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        user_queries::get_user(&self.pool, user_id).await
    }

    async fn list_entries(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>, sqlx::Error> {
        watchlist_queries::get_entries_for_user(&self.pool, user_id).await
    }

    async fn count_entries(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        watchlist_queries::count_entries(&self.pool, user_id).await
    }

    async fn find_entry_by_symbol(
        &self,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<WatchlistEntry>, sqlx::Error> {
        watchlist_queries::get_entry_by_symbol(&self.pool, user_id, symbol).await
    }

    async fn insert_entry(
        &self,
        entry: &NewWatchlistEntry,
    ) -> Result<Option<WatchlistEntry>, sqlx::Error> {
        watchlist_queries::insert_entry(&self.pool, entry).await
    }

    async fn apply_refreshes(&self, refreshes: &[StagedRefresh]) -> Result<u64, sqlx::Error> {
        watchlist_queries::apply_refreshes(&self.pool, refreshes).await
    }

    async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<bool, sqlx::Error> {
        watchlist_queries::delete_entry(&self.pool, user_id, entry_id).await
    }
}
