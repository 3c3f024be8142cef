//! HTTP handlers and router

pub mod auth;
pub mod characters;
pub mod favorites;
pub mod ping;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::db::UserStore;
use crate::services::admission::{AdmissionController, GuestCounter};
use crate::services::catalog::CatalogGateway;
use crate::services::favorites::FavoritesManager;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn UserStore>,
    pub catalog: Arc<dyn CatalogGateway>,
    pub admission: Arc<AdmissionController>,
    pub favorites: Arc<FavoritesManager>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn UserStore>, catalog: Arc<dyn CatalogGateway>) -> Self {
        let admission = AdmissionController::new(
            store.clone(),
            Arc::new(GuestCounter::new()),
            config.quota_reset_period,
        );
        let favorites = FavoritesManager::new(store.clone(), catalog.clone());

        Self {
            config: Arc::new(config),
            store,
            catalog,
            admission: Arc::new(admission),
            favorites: Arc::new(favorites),
        }
    }
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping::ping))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/characters", get(characters::list_characters))
        .route(
            "/favorites",
            post(favorites::add_favorite).get(favorites::list_favorites),
        )
        .route("/favorites/{id}", delete(favorites::remove_favorite))
        .route("/favorites/episodes/count", get(favorites::count_episodes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listen port and serve until Ctrl-C.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    let router = create_router(state);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

// =============================================================================
// Tests
// =============================================================================
