//! Authentication: bearer credentials, password hashing and the per-call
//! caller identity.

use std::convert::Infallible;
use std::net::SocketAddr;

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::AppState;

/// Lifetime of an issued bearer credential
pub const TOKEN_TTL_SECS: usize = 60 * 60;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    /// Issued at (unix timestamp)
    pub iat: usize,
    /// Expiration (unix timestamp)
    pub exp: usize,
}

/// Who is making the current call. Resolved once per request and passed
/// explicitly to the admission controller and route logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerIdentity {
    Authenticated(Uuid),
    Anonymous,
}

/// Generate a JWT access token
pub fn generate_token(user_id: Uuid, username: &str, secret: &str) -> Result<String> {
    let now = chrono::Utc::now().timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a JWT token and return claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("{}", e))?;

    Ok(token_data.claims)
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Resolve the `Authorization` header value of a call.
///
/// - No header, or a scheme other than `Bearer` → `Anonymous`
/// - `Bearer <token>` with a valid token → `Authenticated(sub)`
/// - `Bearer` with a missing, malformed, expired or foreign token → error
pub fn resolve_caller(header: Option<&str>, secret: &str) -> Result<CallerIdentity, ApiError> {
    let Some(value) = header else {
        return Ok(CallerIdentity::Anonymous);
    };

    let value = value.trim();
    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    // RFC 6750: the scheme is case-insensitive
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(CallerIdentity::Anonymous);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::Authentication("missing bearer token".to_string()));
    }

    let claims = validate_token(token, secret).map_err(|e| ApiError::Authentication(e.to_string()))?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|e| ApiError::Authentication(format!("invalid subject in token: {}", e)))?;

    Ok(CallerIdentity::Authenticated(user_id))
}

// =============================================================================
// Extractors
// =============================================================================

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Opaque bytes are decoded lossily so a malformed bearer token is
        // rejected by verification instead of reading as an absent header
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|v| String::from_utf8_lossy(v.as_bytes()));
        resolve_caller(header.as_deref(), &state.config.jwt_secret)
    }
}

/// Caller on a route that requires authentication
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match CallerIdentity::from_request_parts(parts, state).await? {
            CallerIdentity::Authenticated(user_id) => Ok(Self(user_id)),
            CallerIdentity::Anonymous => Err(ApiError::Authorization("authentication required".to_string())),
        }
    }
}

/// Source address of the call, used as the guest quota key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Self(ip))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-at-least-32-bytes-long";

    // ---- Password hashing tests ----

    #[test]
    fn test_hash_password_produces_valid_hash() {
        let hash = hash_password("pw123").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_hash_password_different_each_time() {
        let hash1 = hash_password("same-password").unwrap();
        let hash2 = hash_password("same-password").unwrap();
        assert_ne!(hash1, hash2, "Hashes should differ due to random salt");
    }

    #[test]
    fn test_verify_password_correct_and_incorrect() {
        let hash = hash_password("correct-password").unwrap();
        assert!(verify_password("correct-password", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("any-password", "not-a-valid-hash").is_err());
    }

    // ---- JWT token tests ----

    #[test]
    fn test_generate_and_validate_token() {
        let user_id = Uuid::new_v4();
        let token = generate_token(user_id, "alice", TEST_SECRET).unwrap();

        let claims = validate_token(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    }

    #[test]
    fn test_validate_token_wrong_secret() {
        let token = generate_token(Uuid::new_v4(), "alice", TEST_SECRET).unwrap();
        assert!(validate_token(&token, "another-secret-that-is-also-32-bytes!!").is_err());
    }

    #[test]
    fn test_validate_token_expired() {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "alice".to_string(),
            iat: now - 2 * TOKEN_TTL_SECS,
            exp: now - TOKEN_TTL_SECS,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(validate_token(&token, TEST_SECRET).is_err());
    }

    // ---- resolve_caller tests ----

    #[test]
    fn test_resolve_caller_without_header_is_anonymous() {
        assert_eq!(resolve_caller(None, TEST_SECRET).unwrap(), CallerIdentity::Anonymous);
    }

    #[test]
    fn test_resolve_caller_other_scheme_is_anonymous() {
        let result = resolve_caller(Some("Basic YWxpY2U6cHcxMjM="), TEST_SECRET).unwrap();
        assert_eq!(result, CallerIdentity::Anonymous);
    }

    #[test]
    fn test_resolve_caller_valid_token() {
        let user_id = Uuid::new_v4();
        let token = generate_token(user_id, "alice", TEST_SECRET).unwrap();

        let header = format!("Bearer {}", token);
        assert_eq!(
            resolve_caller(Some(&header), TEST_SECRET).unwrap(),
            CallerIdentity::Authenticated(user_id)
        );

        let header = format!("bearer {}", token);
        assert_eq!(
            resolve_caller(Some(&header), TEST_SECRET).unwrap(),
            CallerIdentity::Authenticated(user_id)
        );
    }

    #[test]
    fn test_resolve_caller_invalid_token_is_rejected_not_anonymous() {
        let result = resolve_caller(Some("Bearer not.a.valid.token"), TEST_SECRET);
        assert!(matches!(result, Err(ApiError::Authentication(_))));

        let result = resolve_caller(Some("Bearer"), TEST_SECRET);
        assert!(matches!(result, Err(ApiError::Authentication(_))));
    }

    #[test]
    fn test_resolve_caller_non_uuid_subject() {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "42".to_string(),
            username: "alice".to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let header = format!("Bearer {}", token);
        assert!(matches!(
            resolve_caller(Some(&header), TEST_SECRET),
            Err(ApiError::Authentication(_))
        ));
    }
}
