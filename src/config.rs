use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;

pub const DEFAULT_MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
        #[error("{0} must be set")]
        Missing(&'static str),

        #[error("invalid value for {key}: {reason}")]
        Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
        pub database_url: String,
        pub database_pool_size: u32,
        pub host: String,
        pub port: u16,
        pub jwt_secret: String,
        pub token_ttl_seconds: i64,
        pub upload_dir: PathBuf,
        pub max_avatar_bytes: usize,
        pub machine_id: i32,
        pub node_id: i32,
}

impl Config {
        pub fn from_env() -> Result<Self, ConfigError> {
                Self::from_lookup(|key| env::var(key).ok())
        }

        /// Builds the configuration from any key lookup, so tests do not have to mutate the process environment.
        pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where
                F: Fn(&str) -> Option<String>,
        {
                Ok(Self {
                        database_url: required(&lookup, "DATABASE_URL")?,
                        database_pool_size: parse_or(&lookup, "DATABASE_POOL_SIZE", 10)?,
                        host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                        port: parse_or(&lookup, "SERVER_PORT", 8080)?,
                        jwt_secret: required(&lookup, "JWT_SECRET")?,
                        token_ttl_seconds: parse_or(&lookup, "TOKEN_TTL_SECONDS", 60 * 60 * 24)?,
                        upload_dir: lookup("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("uploads")),
                        max_avatar_bytes: parse_or(&lookup, "MAX_AVATAR_BYTES", DEFAULT_MAX_AVATAR_BYTES)?,
                        machine_id: parse_or(&lookup, "MACHINE_ID", 1)?,
                        node_id: parse_or(&lookup, "NODE_ID", 1)?,
                })
        }

        pub fn avatar_dir(&self) -> PathBuf {
                self.upload_dir.join("avatars")
        }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
        F: Fn(&str) -> Option<String>,
{
        lookup(key).filter(|value| !value.is_empty()).ok_or(ConfigError::Missing(key))
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
        F: Fn(&str) -> Option<String>,
        T: FromStr + Display,
        T::Err: Display,
{
        match lookup(key) {
                Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                        key,
                        reason: e.to_string(),
                }),
                None => {
                        info!("{key} not set, using default: {default}");
                        Ok(default)
                }
        }
}
