//! Process-local user store.
//!
//! Holds all accounts in one mutex-guarded map. Every operation runs its
//! read-decide-write sequence under the lock, which gives the same per-user
//! atomicity as the row lock in the PostgreSQL store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{
    add_to_favorites, decide_quota, remove_from_favorites, FavoriteAddition, FavoriteRemoval,
    QuotaDecision, StoreError, StoreResult, UserStore,
};
use crate::types::User;

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<User> {
        let mut users = self.users.lock();
        if users.values().any(|u| u.username == username) {
            return Err(StoreError::AlreadyExists(username.to_string()));
        }
        let user = User::new(username, password_hash);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let users = self.users.lock();
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.lock().get(&user_id).cloned())
    }

    async fn consume_quota(
        &self,
        user_id: Uuid,
        limit: i32,
        reset_period: Option<Duration>,
    ) -> StoreResult<QuotaDecision> {
        let mut users = self.users.lock();
        let user = users.get_mut(&user_id).ok_or(StoreError::UserNotFound(user_id))?;

        let now = Utc::now();
        let (decision, started) =
            decide_quota(user.request_count, user.quota_period_started_at, limit, reset_period, now);
        if let QuotaDecision::Admitted { used } = decision {
            user.request_count = used;
            user.quota_period_started_at = started;
            user.updated_at = now;
        }
        Ok(decision)
    }

    async fn add_favorite(
        &self,
        user_id: Uuid,
        character_id: i32,
        capacity: usize,
    ) -> StoreResult<FavoriteAddition> {
        let mut users = self.users.lock();
        let user = users.get_mut(&user_id).ok_or(StoreError::UserNotFound(user_id))?;

        let outcome = add_to_favorites(user.favorites.clone(), character_id, capacity);
        if let FavoriteAddition::Added(ref favorites) = outcome {
            user.favorites = favorites.clone();
            user.updated_at = Utc::now();
        }
        Ok(outcome)
    }

    async fn remove_favorite(&self, user_id: Uuid, character_id: i32) -> StoreResult<FavoriteRemoval> {
        let mut users = self.users.lock();
        let user = users.get_mut(&user_id).ok_or(StoreError::UserNotFound(user_id))?;

        let outcome = remove_from_favorites(user.favorites.clone(), character_id);
        if let FavoriteRemoval::Removed(ref favorites) = outcome {
            user.favorites = favorites.clone();
            user.updated_at = Utc::now();
        }
        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
