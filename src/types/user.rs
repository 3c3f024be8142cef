//! User types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account entity owned by the credential store
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,

    /// Favorite character ids, insertion order, no duplicates
    pub favorites: Vec<i32>,

    /// Admitted calls in the current quota period
    pub request_count: i32,
    /// Start of the current quota period (set on first admitted call)
    pub quota_period_started_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Fresh account with no favorites and an unused quota
    pub fn new(username: &str, password_hash: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            favorites: Vec::new(),
            request_count: 0,
            quota_period_started_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
