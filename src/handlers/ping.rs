//! Ping handler for health checks

use axum::Json;
use tracing::debug;

use crate::types::PongResponse;

/// `GET /ping` (no auth, not rate-limited)
pub async fn ping() -> Json<PongResponse> {
    debug!("Received ping");

    Json(PongResponse {
        message: "Pong".to_string(),
        timestamp: chrono::Utc::now(),
    })
}
