mod postgres;

pub use postgres::PgWatchlistStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{NewWatchlistEntry, StagedRefresh, User, WatchlistEntry};

/// Persistence handle for users and their watchlists.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;

    async fn list_entries(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>, sqlx::Error>;

    async fn count_entries(&self, user_id: Uuid) -> Result<i64, sqlx::Error>;

    async fn find_entry_by_symbol(
        &self,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<WatchlistEntry>, sqlx::Error>;

    /// Returns `None` when the user's watchlist is already at capacity.
    async fn insert_entry(
        &self,
        entry: &NewWatchlistEntry,
    ) -> Result<Option<WatchlistEntry>, sqlx::Error>;

    /// Applies all refreshes atomically and returns the number of rows updated.
    async fn apply_refreshes(&self, refreshes: &[StagedRefresh]) -> Result<u64, sqlx::Error>;

    /// Deletes an entry only if `user_id` owns it.
    async fn delete_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<bool, sqlx::Error>;
}
