//! User database queries

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    add_to_favorites, decide_quota, remove_from_favorites, FavoriteAddition, FavoriteRemoval,
    QuotaDecision, StoreError, StoreResult, UserStore,
};
use crate::types::user::User;

const USER_COLUMNS: &str = r#"
    id, username, password_hash, favorites,
    request_count, quota_period_started_at,
    created_at, updated_at
"#;

/// PostgreSQL-backed user store
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<User> {
        let query = format!(
            r#"
            INSERT INTO users (id, username, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await?;

        user.ok_or_else(|| StoreError::AlreadyExists(username.to_string()))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn consume_quota(
        &self,
        user_id: Uuid,
        limit: i32,
        reset_period: Option<Duration>,
    ) -> StoreResult<QuotaDecision> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i32, Option<DateTime<Utc>>)> = sqlx::query_as(
            "SELECT request_count, quota_period_started_at FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (count, started) = row.ok_or(StoreError::UserNotFound(user_id))?;

        let (decision, started) = decide_quota(count, started, limit, reset_period, Utc::now());
        if let QuotaDecision::Admitted { used } = decision {
            sqlx::query(
                r#"
                UPDATE users
                SET request_count = $2, quota_period_started_at = $3, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .bind(used)
            .bind(started)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }

        Ok(decision)
    }

    async fn add_favorite(
        &self,
        user_id: Uuid,
        character_id: i32,
        capacity: usize,
    ) -> StoreResult<FavoriteAddition> {
        let mut tx = self.pool.begin().await?;

        let favorites = lock_favorites(&mut tx, user_id).await?;
        let outcome = add_to_favorites(favorites, character_id, capacity);
        if let FavoriteAddition::Added(ref favorites) = outcome {
            write_favorites(&mut tx, user_id, favorites).await?;
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }

        Ok(outcome)
    }

    async fn remove_favorite(&self, user_id: Uuid, character_id: i32) -> StoreResult<FavoriteRemoval> {
        let mut tx = self.pool.begin().await?;

        let favorites = lock_favorites(&mut tx, user_id).await?;
        let outcome = remove_from_favorites(favorites, character_id);
        if let FavoriteRemoval::Removed(ref favorites) = outcome {
            write_favorites(&mut tx, user_id, favorites).await?;
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }

        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// Read a user's favorites and hold the row lock until the transaction ends
async fn lock_favorites(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
) -> StoreResult<Vec<i32>> {
    let row: Option<(Vec<i32>,)> =
        sqlx::query_as("SELECT favorites FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

    row.map(|(favorites,)| favorites)
        .ok_or(StoreError::UserNotFound(user_id))
}

async fn write_favorites(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    favorites: &[i32],
) -> StoreResult<()> {
    sqlx::query("UPDATE users SET favorites = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(favorites)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

// =============================================================================
// Integration tests (require a live DB)
// =============================================================================
