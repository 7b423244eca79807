use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
    pub media_root: PathBuf,
    pub session_ttl: Duration,
    pub redis_url: Option<String>,
    pub cors_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            database_path: PathBuf::from("tracker.sqlite3"),
            media_root: PathBuf::from("media"),
            session_ttl: Duration::from_secs(14 * 24 * 60 * 60),
            redis_url: None,
            cors_origin: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("RUST_PORT", "8000")?,
            database_path: try_load("DATABASE_PATH", "tracker.sqlite3")?,
            media_root: try_load("MEDIA_ROOT", "media")?,
            session_ttl: Duration::from_secs(try_load("SESSION_TTL_SECS", "1209600")?),
            redis_url: optional("REDIS_URL"),
            cors_origin: optional("CORS_ORIGIN"),
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");

            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        })
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .inspect(|_| info!("{key} is set"))
}
