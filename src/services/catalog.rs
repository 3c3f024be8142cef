//! Character catalog client
//!
//! `CatalogGateway` is the read-only upstream the gateway proxies. The
//! production implementation talks to the Rick and Morty API over HTTP.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::types::Character;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Catalog trait - abstraction over the upstream character source
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Fetch one character; fails for unknown ids and unreachable upstream
    async fn fetch_one(&self, id: i32) -> Result<Character>;

    /// Fetch one page of the character listing (upstream default page when `None`).
    /// The body is returned exactly as the upstream served it.
    async fn fetch_all(&self, page: Option<u32>) -> Result<Value>;

    /// Get the name of this catalog implementation
    fn name(&self) -> &'static str;
}

/// Rick and Morty API client
pub struct RickAndMortyCatalog {
    base_url: String,
    client: reqwest::Client,
}

impl RickAndMortyCatalog {
    /// Create a new client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("favorites-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl CatalogGateway for RickAndMortyCatalog {
    async fn fetch_one(&self, id: i32) -> Result<Character> {
        let url = format!("{}/character/{}", self.base_url, id);

        let character = self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to request character {}", id))?
            .error_for_status()
            .with_context(|| format!("Catalog rejected character {}", id))?
            .json::<Character>()
            .await
            .with_context(|| format!("Failed to parse character {}", id))?;

        Ok(character)
    }

    async fn fetch_all(&self, page: Option<u32>) -> Result<Value> {
        let url = format!("{}/character", self.base_url);

        let mut request = self.client.get(&url);
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }

        let listing = request
            .send()
            .await
            .context("Failed to request character listing")?
            .error_for_status()
            .context("Catalog rejected character listing")?
            .json::<Value>()
            .await
            .context("Failed to parse character listing")?;

        Ok(listing)
    }

    fn name(&self) -> &'static str {
        "rickandmorty"
    }
}

// ==========================================================================
// In-process catalog for tests
// ==========================================================================
