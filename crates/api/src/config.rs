//! Process configuration, read from the environment (and `.env` if present).

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub query_timeout: Duration,
    pub bcrypt_cost: u32,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("database_max_connections", &self.database_max_connections)
            .field("token_ttl", &self.token_ttl)
            .field("query_timeout", &self.query_timeout)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is the normal case outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let database_max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;

        let jwt_secret = match lookup("JWT_SECRET").filter(|v| !v.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let ttl_secs = parse_or(&lookup, "TOKEN_TTL_SECS", 72 * 60 * 60i64)?;
        if ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                key: "TOKEN_TTL_SECS",
                value: ttl_secs.to_string(),
            });
        }

        let timeout_secs = parse_or(&lookup, "QUERY_TIMEOUT_SECS", 3u64)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "QUERY_TIMEOUT_SECS",
                value: "0".into(),
            });
        }

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", eventhub_auth::password::DEFAULT_COST)?;

        Ok(Self {
            bind_addr,
            database_url,
            database_max_connections,
            jwt_secret,
            token_ttl: chrono::Duration::seconds(ttl_secs),
            query_timeout: Duration::from_secs(timeout_secs),
            bcrypt_cost,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
