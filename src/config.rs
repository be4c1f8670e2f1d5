//! Runtime configuration loaded from the environment (and an optional `.env` file).

use std::fmt;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_MAX_CONNECTIONS: u32 = 8;
const MIN_SESSION_KEY_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// Cookie signing key; `None` means a random key is generated at startup.
    pub session_key: Option<String>,
    pub cookie_secure: bool,
    pub admin_password: String,
    pub db_max_connections: u32,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "Missing required environment variable {key}"),
            ConfigError::Invalid { key, value } => write!(f, "Invalid value for {key}: '{value}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_ok() {
            log::info!("Loaded environment from .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let session_key = match get("SESSION_KEY") {
            Some(val) if val.len() >= MIN_SESSION_KEY_LEN => Some(val),
            Some(val) => {
                log::warn!(
                    "SESSION_KEY too short ({} bytes, need {}+); generating a random key",
                    val.len(),
                    MIN_SESSION_KEY_LEN
                );
                None
            }
            None => None,
        };

        let cookie_secure = match get("COOKIE_SECURE").as_deref() {
            None | Some("") | Some("false") | Some("0") => false,
            Some("true") | Some("1") => true,
            Some(other) => {
                return Err(ConfigError::Invalid { key: "COOKIE_SECURE", value: other.to_string() });
            }
        };

        let admin_password =
            get("ADMIN_PASSWORD").unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", value: raw })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            bind_addr,
            session_key,
            cookie_secure,
            admin_password,
            db_max_connections,
        })
    }
}
