//! Favorites Gateway - authenticated REST gateway over the character catalog
//!
//! Adds user accounts, per-account favorites and request quotas on top of
//! the public Rick and Morty API.

mod auth;
mod cli;
mod config;
mod db;
mod error;
mod handlers;
mod services;
mod types;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::services::catalog::{CatalogGateway, RickAndMortyCatalog};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs directory - use LOGS_DIR env var or default to ./logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "gateway.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,favorites_gateway=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
        .init();

    let config = config::Config::from_env()?;
    info!("Configuration loaded");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            if config.database_url == db::MEMORY_DATABASE_URL {
                anyhow::bail!("The in-memory store has no migrations; set DATABASE_URL to a PostgreSQL URL");
            }
            let pool = db::create_pool(&config.database_url).await?;
            db::run_migrations(&pool).await?;
            Ok(())
        }
        Command::Serve => {
            info!("Starting Favorites Gateway...");

            let store = db::connect_store(&config.database_url).await?;
            info!("User store initialized: {}", store.name());

            let catalog: Arc<dyn CatalogGateway> = Arc::new(RickAndMortyCatalog::new(&config.catalog_url)?);
            info!("Catalog initialized: {} at {}", catalog.name(), config.catalog_url);

            match config.quota_reset_period {
                Some(period) => info!("Authenticated quota resets every {}s", period.as_secs()),
                None => info!("Authenticated quota never resets"),
            }

            let state = handlers::AppState::new(config, store, catalog);
            handlers::serve(state).await
        }
    }
}
