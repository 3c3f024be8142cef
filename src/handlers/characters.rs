//! Catalog browsing (optional auth, rate-limited)

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde_json::Value;

use super::AppState;
use crate::auth::{CallerIdentity, ClientIp};
use crate::error::{ApiError, ApiResult};
use crate::types::PageQuery;

/// `GET /characters` - forwards the upstream listing unchanged
pub async fn list_characters(
    State(state): State<AppState>,
    caller: CallerIdentity,
    ip: ClientIp,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;

    state.admission.admit(&caller, &ip).await?;

    let page = state
        .catalog
        .fetch_all(query.page)
        .await
        .map_err(ApiError::Upstream)?;

    Ok(Json(page))
}
