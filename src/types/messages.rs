//! HTTP request and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `/register` and `/login`. Fields are optional so that a missing
/// field is reported as a validation error instead of a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Body of `POST /favorites`. The id is kept raw and validated by the
/// favorites manager (must be a positive integer).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddFavoriteRequest {
    pub character_id: Option<serde_json::Value>,
}

/// Query string of `GET /characters`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

/// Confirmation of a favorites mutation (add or remove)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteChange {
    pub name: String,
    pub message: String,
    pub favorites: Vec<i32>,
}

/// One resolved favorite in `GET /favorites`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoriteSummary {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEpisodes {
    pub id: i32,
    pub name: String,
    pub episode_count: usize,
}

/// Result of `GET /favorites/episodes/count`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeCount {
    pub favorites: Vec<FavoriteEpisodes>,
    /// Number of distinct episodes across all favorites
    pub total_episodes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
