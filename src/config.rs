// config.rs
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub database_max_connections: u32,
    // notification delivery
    pub notification_max_attempts: u32,
    pub notification_retry_delay: Duration,
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "invalid config value, using default");
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn init() -> anyhow::Result<Config> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let port = env_or("PORT", 8000u16);
        let database_max_connections = env_or("DATABASE_MAX_CONNECTIONS", 20u32);
        let notification_max_attempts = env_or("NOTIFICATION_MAX_ATTEMPTS", 3u32);
        let retry_delay_ms = env_or("NOTIFICATION_RETRY_DELAY_MS", 200u64);

        Ok(Config {
            database_url,
            port,
            database_max_connections,
            notification_max_attempts,
            notification_retry_delay: Duration::from_millis(retry_delay_ms),
        })
    }
}
