//! Authentication handlers: register, login

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, warn};

use super::AppState;
use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::types::{CredentialsRequest, LoginResponse, RegisterResponse};

/// Both fields must be present and non-empty
fn required_credentials(request: CredentialsRequest) -> ApiResult<(String, String)> {
    match (request.username, request.password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            Ok((username, password))
        }
        _ => Err(ApiError::Validation("username and password are required".to_string())),
    }
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_password(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || auth::hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(request) = payload?;
    let (username, password) = required_credentials(request)?;

    let password_hash = hash_password(password).await?;
    let user = state.store.create_user(&username, &password_hash).await?;
    debug!("Registered user: {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload?;
    let (username, password) = required_credentials(request)?;

    let user = state
        .store
        .find_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    if !verify_password(password, user.password_hash.clone()).await? {
        warn!("Invalid password for user: {}", user.username);
        return Err(ApiError::InvalidCredentials("invalid password".to_string()));
    }

    let token = auth::generate_token(user.id, &user.username, &state.config.jwt_secret)
        .map_err(|e| ApiError::Internal(format!("failed to generate token: {}", e)))?;
    debug!("User logged in: {}", user.username);

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
    }))
}
