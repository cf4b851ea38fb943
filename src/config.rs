// src/config.rs

use std::{env, fmt, net::SocketAddr, time::Duration};

use dotenvy::dotenv;

/// Default scaling bounds for essay questions.
pub const DEFAULT_ESSAY_MIN_SCORE: i32 = 75;
pub const DEFAULT_ESSAY_MAX_SCORE: i32 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub db_timeout: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, value) => {
                write!(f, "{} has an invalid value: {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = parsed("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;
        let db_timeout = Duration::from_secs(parsed("DB_TIMEOUT_SECS", 5)?);
        let request_timeout = Duration::from_secs(parsed("REQUEST_TIMEOUT_SECS", 15)?);

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            db_timeout,
            request_timeout,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}
