//! Server configuration from environment variables
//!
//! Environment:
//! - CHAT_BIND_ADDR: Listen address (default 127.0.0.1:8000)
//! - CHAT_DATA_FILE: Journal file path (optional; in-memory only when unset)
//! - CHAT_JWT_SECRET: Secret key for signing tokens (min 32 chars)
//! - CHAT_ACCESS_TOKEN_TTL: Access token TTL in seconds (default 3600)
//! - CHAT_REFRESH_TOKEN_TTL: Refresh token TTL in seconds (default 604800)
//! - CHAT_BCRYPT_COST: bcrypt cost factor (default 12)

use std::net::SocketAddr;
use std::path::PathBuf;

use uuid::Uuid;

/// Minimum accepted length of the JWT secret
pub const MIN_SECRET_LEN: usize = 32;

/// Configuration errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("CHAT_JWT_SECRET must be at least 32 characters")]
    SecretTooShort,
}

/// Runtime configuration of the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_file: Option<PathBuf>,
    pub jwt_secret: String,
    pub access_token_ttl: i64,
    pub refresh_token_ttl: i64,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            data_file: None,
            jwt_secret: generate_secret(),
            access_token_ttl: 3600,
            refresh_token_ttl: 604800,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("CHAT_BIND_ADDR") {
            config.bind_addr = parse("CHAT_BIND_ADDR", addr)?;
        }

        config.data_file = lookup("CHAT_DATA_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        match lookup("CHAT_JWT_SECRET") {
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(ConfigError::SecretTooShort)
            }
            Some(secret) => config.jwt_secret = secret,
            None => {
                tracing::warn!(
                    "CHAT_JWT_SECRET not set, using a random secret; tokens will not survive a restart"
                );
            }
        }

        if let Some(ttl) = lookup("CHAT_ACCESS_TOKEN_TTL") {
            config.access_token_ttl = parse("CHAT_ACCESS_TOKEN_TTL", ttl)?;
        }

        if let Some(ttl) = lookup("CHAT_REFRESH_TOKEN_TTL") {
            config.refresh_token_ttl = parse("CHAT_REFRESH_TOKEN_TTL", ttl)?;
        }

        if let Some(cost) = lookup("CHAT_BCRYPT_COST") {
            let cost: u32 = parse("CHAT_BCRYPT_COST", cost)?;
            if !(4..=31).contains(&cost) {
                return Err(ConfigError::InvalidValue {
                    var: "CHAT_BCRYPT_COST",
                    value: cost.to_string(),
                });
            }
            config.bcrypt_cost = cost;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { var, value })
}

/// 256-bit random hex secret
fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
