//! 文档存储抽象：MongoDB 实现用于生产，内存实现用于开发与测试。

use crate::catalog::{FacetField, GameFilter, SortSpec};
use crate::error::Result;
use crate::models::Game;
use crate::user::{LibraryAction, User};
use async_trait::async_trait;

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::{
    database_from_uri, resolve_database_name, MongoStore, DEFAULT_DB_NAME, DEFAULT_MONGO_URI,
};

/// Read side of the game catalog plus the seeding entry point.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Filtered, sorted window of games. `limit == 0` means no limit.
    async fn find_games(
        &self,
        filter: &GameFilter,
        sort: &SortSpec,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Game>>;

    async fn count_games(&self, filter: &GameFilter) -> Result<u64>;

    /// Up to `size` random games matching the filter.
    async fn sample_games(&self, filter: &GameFilter, size: usize) -> Result<Vec<Game>>;

    async fn find_game(&self, game_id: i64) -> Result<Option<Game>>;

    /// Distinct non-empty values of one facet across the catalog (unsorted).
    async fn distinct_values(&self, field: FacetField) -> Result<Vec<String>>;

    /// Genres (`genres.fr`) carried by at least `min_count` games.
    async fn genres_with_at_least(&self, min_count: u64) -> Result<Vec<String>>;

    /// Drop the catalog and insert `games` in its place.
    async fn replace_games(&self, games: Vec<Game>) -> Result<usize>;
}

/// User documents.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Next value of the user id sequence (atomic).
    async fn next_user_id(&self) -> Result<i64>;

    /// Insert; fails with `AlreadyExists` on a duplicate email or username.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn find_user(&self, user_id: i64) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>>;

    async fn find_user_by_verification_token(&self, token: &str) -> Result<Option<User>>;

    /// Verified user whose account was activated with `token`.
    async fn find_user_verified_with(&self, token: &str) -> Result<Option<User>>;

    /// Replace the stored document with the same `user_id`.
    async fn save_user(&self, user: &User) -> Result<()>;

    /// Flip membership of `game_id` in the user's `game_list` atomically.
    /// Returns `None` when the user does not exist.
    async fn toggle_game(
        &self,
        user_id: i64,
        game_id: i64,
    ) -> Result<Option<(LibraryAction, Vec<i64>)>>;

    async fn delete_all_users(&self) -> Result<u64>;
}
