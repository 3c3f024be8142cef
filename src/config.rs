//! Configuration management

use std::time::Duration;

use anyhow::{self, Context, Result};

/// Default upstream character catalog
pub const DEFAULT_CATALOG_URL: &str = "https://rickandmortyapi.com/api";

pub const DEFAULT_PORT: u16 = 3000;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential store connection string (`postgres://…` or `memory`)
    pub database_url: String,

    /// JWT secret key for token signing/validation
    pub jwt_secret: String,

    /// HTTP listen port
    pub port: u16,

    /// Character catalog base URL
    pub catalog_url: String,

    /// Quota period for authenticated callers. `None` means the request
    /// count is never reset.
    pub quota_reset_period: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let jwt_secret = lookup("JWT_SECRET")
            .context("JWT_SECRET must be set — generate one with: openssl rand -base64 48")?;

        if jwt_secret.len() < 32 {
            anyhow::bail!(
                "JWT_SECRET must be at least 32 bytes (current: {} bytes). Generate one with: openssl rand -base64 48",
                jwt_secret.len()
            );
        }

        const KNOWN_DEV_SECRETS: &[&str] = &[
            "dev-secret-change-in-production-min-32-bytes!!",
        ];
        if KNOWN_DEV_SECRETS.contains(&jwt_secret.as_str()) {
            tracing::warn!("⚠ JWT_SECRET matches a known default — change it for production!");
        }

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", raw))?,
            None => DEFAULT_PORT,
        };

        let catalog_url = lookup("CATALOG_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());

        let quota_reset_period = match lookup("QUOTA_RESET_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .with_context(|| format!("QUOTA_RESET_SECS must be a number of seconds, got '{}'", raw))?;
                if secs == 0 {
                    anyhow::bail!("QUOTA_RESET_SECS must be greater than zero (unset it to never reset)");
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            port,
            catalog_url,
            quota_reset_period,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-for-jwt-at-least-32-bytes-long";

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://test"), ("JWT_SECRET", SECRET)]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);
        assert!(config.quota_reset_period.is_none());
    }

    #[test]
    fn test_config_requires_database_url_and_secret() {
        assert!(load(&[("JWT_SECRET", SECRET)]).is_err());
        assert!(load(&[("DATABASE_URL", "postgres://test")]).is_err());
    }

    #[test]
    fn test_config_rejects_short_secret() {
        let err = load(&[("DATABASE_URL", "memory"), ("JWT_SECRET", "short")]).unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_config_parses_port_and_catalog_url() {
        let config = load(&[
            ("DATABASE_URL", "memory"),
            ("JWT_SECRET", SECRET),
            ("PORT", "8080"),
            ("CATALOG_URL", "http://localhost:9000/api/"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.catalog_url, "http://localhost:9000/api");
    }

    #[test]
    fn test_config_rejects_invalid_port() {
        assert!(load(&[("DATABASE_URL", "memory"), ("JWT_SECRET", SECRET), ("PORT", "http")]).is_err());
    }

    #[test]
    fn test_config_quota_reset_period() {
        let config = load(&[
            ("DATABASE_URL", "memory"),
            ("JWT_SECRET", SECRET),
            ("QUOTA_RESET_SECS", "86400"),
        ])
        .unwrap();
        assert_eq!(config.quota_reset_period, Some(Duration::from_secs(86400)));

        assert!(load(&[("DATABASE_URL", "memory"), ("JWT_SECRET", SECRET), ("QUOTA_RESET_SECS", "0")]).is_err());
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_from_env() {
        std::env::set_var("DATABASE_URL", "memory");
        std::env::set_var("JWT_SECRET", SECRET);
        std::env::remove_var("PORT");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database_url, "memory");
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
