//! Credential store
//!
//! `UserStore` is the boundary to persisted accounts. Every mutating
//! operation is atomic per user record: quota consumption and favorites
//! changes are decided and written in one step, so concurrent calls for
//! the same user cannot over-admit or overfill the favorites list.
//!
//! Two backends exist:
//! - `PgUserStore` (PostgreSQL via sqlx, `postgres://` URLs)
//! - `MemoryUserStore` (process-local, `DATABASE_URL=memory`)

pub mod memory;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::types::User;

pub use memory::MemoryUserStore;
pub use queries::user::PgUserStore;

/// `DATABASE_URL` value selecting the in-memory store
pub const MEMORY_DATABASE_URL: &str = "memory";

// =============================================================================
// Store contract
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username '{0}' is already taken")]
    AlreadyExists(String),

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of a conditional quota increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Counter was incremented; `used` is the new value
    Admitted { used: i32 },
    /// Counter already at the cap; nothing was written
    Exhausted { used: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteAddition {
    Added(Vec<i32>),
    /// Id was already a favorite; nothing was written
    AlreadyPresent(Vec<i32>),
    /// List is at capacity; nothing was written
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteRemoval {
    Removed(Vec<i32>),
    /// Id was not a favorite; nothing was written
    Missing,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account with empty favorites and zero request count
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<User>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    /// Increment `request_count` unless it is already at `limit`.
    /// With a `reset_period`, an expired period restarts the count at zero first.
    async fn consume_quota(
        &self,
        user_id: Uuid,
        limit: i32,
        reset_period: Option<Duration>,
    ) -> StoreResult<QuotaDecision>;

    async fn add_favorite(
        &self,
        user_id: Uuid,
        character_id: i32,
        capacity: usize,
    ) -> StoreResult<FavoriteAddition>;

    async fn remove_favorite(&self, user_id: Uuid, character_id: i32) -> StoreResult<FavoriteRemoval>;

    /// Get the name of this store implementation
    fn name(&self) -> &'static str;
}

// =============================================================================
// Shared decision logic (both backends apply these under their own lock)
// =============================================================================

/// Whether the quota period that began at `started` is over.
pub(crate) fn quota_period_expired(
    started: Option<DateTime<Utc>>,
    reset_period: Option<Duration>,
    now: DateTime<Utc>,
) -> bool {
    match (reset_period, started) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(period), Some(started)) => (now - started)
            .to_std()
            .map(|elapsed| elapsed >= period)
            .unwrap_or(false),
    }
}

/// Apply the increment-with-cap rule to a counter snapshot.
/// Returns the decision and, when admitted, the period start to persist.
pub(crate) fn decide_quota(
    count: i32,
    started: Option<DateTime<Utc>>,
    limit: i32,
    reset_period: Option<Duration>,
    now: DateTime<Utc>,
) -> (QuotaDecision, Option<DateTime<Utc>>) {
    let (count, started) = if quota_period_expired(started, reset_period, now) {
        (0, now)
    } else {
        (count, started.unwrap_or(now))
    };

    if count >= limit {
        return (QuotaDecision::Exhausted { used: count }, None);
    }
    (QuotaDecision::Admitted { used: count + 1 }, Some(started))
}

/// Capacity is checked before membership: a full list rejects even an id it
/// already holds.
pub(crate) fn add_to_favorites(mut favorites: Vec<i32>, character_id: i32, capacity: usize) -> FavoriteAddition {
    if favorites.len() >= capacity {
        return FavoriteAddition::Full;
    }
    if favorites.contains(&character_id) {
        return FavoriteAddition::AlreadyPresent(favorites);
    }
    favorites.push(character_id);
    FavoriteAddition::Added(favorites)
}

pub(crate) fn remove_from_favorites(mut favorites: Vec<i32>, character_id: i32) -> FavoriteRemoval {
    if !favorites.contains(&character_id) {
        return FavoriteRemoval::Missing;
    }
    favorites.retain(|&id| id != character_id);
    FavoriteRemoval::Removed(favorites)
}

// =============================================================================
// Connection setup
// =============================================================================

/// Create a database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Run the embedded database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    let migrator = sqlx::migrate!("./migrations");
    let versions: Vec<i64> = migrator.iter().map(|m| m.version).collect();
    info!("Compiled migration versions: {:?}", versions);

    migrator.run(pool).await.context("Failed to apply migrations")?;

    info!("Database migrations complete");
    Ok(())
}

/// Build the store selected by `DATABASE_URL`.
/// PostgreSQL stores are migrated before being returned.
pub async fn connect_store(database_url: &str) -> Result<Arc<dyn UserStore>> {
    if database_url == MEMORY_DATABASE_URL {
        tracing::warn!("Using in-memory user store, accounts are lost on restart");
        return Ok(Arc::new(MemoryUserStore::new()));
    }

    let pool = create_pool(database_url).await?;
    info!("Connected to PostgreSQL");
    run_migrations(&pool).await?;

    Ok(Arc::new(PgUserStore::new(pool)))
}
