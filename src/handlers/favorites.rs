//! Favorites handlers (auth required)

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;

use super::AppState;
use crate::auth::{AuthenticatedUser, CallerIdentity, ClientIp};
use crate::error::{ApiError, ApiResult};
use crate::services::favorites::{parse_character_id, parse_path_id};
use crate::types::{AddFavoriteRequest, EpisodeCount, FavoriteChange, FavoriteSummary};

/// `POST /favorites`
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    payload: Result<Json<AddFavoriteRequest>, JsonRejection>,
) -> ApiResult<Json<FavoriteChange>> {
    let Json(request) = payload?;
    let character_id = parse_character_id(request.character_id.as_ref())?;

    Ok(Json(state.favorites.add(user_id, character_id).await?))
}

/// `GET /favorites`
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<Json<Vec<FavoriteSummary>>> {
    Ok(Json(state.favorites.list(user_id).await?))
}

/// `DELETE /favorites/{id}`
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<FavoriteChange>> {
    let Path(raw_id) = path.map_err(|e| ApiError::Validation(e.body_text()))?;
    let character_id = parse_path_id(&raw_id)?;

    Ok(Json(state.favorites.remove(user_id, character_id).await?))
}

/// `GET /favorites/episodes/count` (rate-limited)
pub async fn count_episodes(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    ip: ClientIp,
) -> ApiResult<Json<EpisodeCount>> {
    state
        .admission
        .admit(&CallerIdentity::Authenticated(user_id), &ip)
        .await?;

    Ok(Json(state.favorites.count_episodes(user_id).await?))
}
