//! Favorites manager
//!
//! Owns the rules for a user's favorite characters: at most
//! `MAX_FAVORITES` entries, no duplicates, removal only of present ids.
//! Mutations are persisted before the catalog lookup that enriches the
//! response; an enrichment failure is reported but the mutation stays.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;
use uuid::Uuid;

use crate::db::{FavoriteAddition, FavoriteRemoval, UserStore};
use crate::error::ApiError;
use crate::services::catalog::CatalogGateway;
use crate::types::{
    Character, EpisodeCount, FavoriteChange, FavoriteEpisodes, FavoriteSummary, User,
};

pub const MAX_FAVORITES: usize = 3;

/// Validate a raw `characterId` value: a JSON integer in `1..=i32::MAX`.
pub fn parse_character_id(value: Option<&serde_json::Value>) -> Result<i32, ApiError> {
    value
        .and_then(serde_json::Value::as_i64)
        .filter(|id| *id > 0)
        .and_then(|id| i32::try_from(id).ok())
        .ok_or_else(|| {
            ApiError::Validation("characterId is required and must be a positive integer".to_string())
        })
}

/// Validate a character id taken from a URL path segment.
pub fn parse_path_id(raw: &str) -> Result<i32, ApiError> {
    raw.parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::Validation(format!("invalid character id '{}'", raw)))
}

pub struct FavoritesManager {
    store: Arc<dyn UserStore>,
    catalog: Arc<dyn CatalogGateway>,
}

impl FavoritesManager {
    pub fn new(store: Arc<dyn UserStore>, catalog: Arc<dyn CatalogGateway>) -> Self {
        Self { store, catalog }
    }

    /// Add a favorite. Adding an id that is already present succeeds
    /// without writing.
    pub async fn add(&self, user_id: Uuid, character_id: i32) -> Result<FavoriteChange, ApiError> {
        let favorites = match self.store.add_favorite(user_id, character_id, MAX_FAVORITES).await? {
            FavoriteAddition::Added(favorites) => {
                debug!(user_id = %user_id, character_id, "Added favorite");
                favorites
            }
            FavoriteAddition::AlreadyPresent(favorites) => favorites,
            FavoriteAddition::Full => {
                return Err(ApiError::Capacity(format!(
                    "maximum of {} favorites reached",
                    MAX_FAVORITES
                )));
            }
        };

        let character = self.character(character_id).await?;
        Ok(FavoriteChange {
            name: character.name,
            message: "Added to favorites".to_string(),
            favorites,
        })
    }

    /// Resolve every favorite to `{id, name}`. Any failed lookup fails the
    /// whole listing.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<FavoriteSummary>, ApiError> {
        let user = self.load_user(user_id).await?;
        if user.favorites.is_empty() {
            return Ok(Vec::new());
        }

        let characters = try_join_all(user.favorites.iter().map(|&id| self.character(id))).await?;
        Ok(user
            .favorites
            .iter()
            .zip(characters)
            .map(|(&id, character)| FavoriteSummary { id, name: character.name })
            .collect())
    }

    pub async fn remove(&self, user_id: Uuid, character_id: i32) -> Result<FavoriteChange, ApiError> {
        let favorites = match self.store.remove_favorite(user_id, character_id).await? {
            FavoriteRemoval::Removed(favorites) => {
                debug!(user_id = %user_id, character_id, "Removed favorite");
                favorites
            }
            FavoriteRemoval::Missing => {
                return Err(ApiError::NotFound(format!(
                    "character {} is not in your favorites",
                    character_id
                )));
            }
        };

        let character = self.character(character_id).await?;
        Ok(FavoriteChange {
            name: character.name,
            message: "Removed from favorites".to_string(),
            favorites,
        })
    }

    /// Per-favorite episode counts plus the number of distinct episodes
    /// across all favorites (set union, not a sum).
    pub async fn count_episodes(&self, user_id: Uuid) -> Result<EpisodeCount, ApiError> {
        let user = self.load_user(user_id).await?;
        if user.favorites.is_empty() {
            return Err(ApiError::NotFound("no favorites found".to_string()));
        }

        let characters = try_join_all(user.favorites.iter().map(|&id| self.character(id))).await?;

        let mut episodes: HashSet<String> = HashSet::new();
        let mut details = Vec::with_capacity(characters.len());
        for (&id, character) in user.favorites.iter().zip(characters) {
            details.push(FavoriteEpisodes {
                id,
                name: character.name,
                episode_count: character.episode.len(),
            });
            episodes.extend(character.episode);
        }

        Ok(EpisodeCount {
            favorites: details,
            total_episodes: episodes.len(),
        })
    }

    async fn load_user(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("user {} not found", user_id)))
    }

    async fn character(&self, id: i32) -> Result<Character, ApiError> {
        self.catalog.fetch_one(id).await.map_err(ApiError::Upstream)
    }
}

// =============================================================================
// Tests
// =============================================================================
