//! Runtime configuration from environment.

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
}

impl Config {
    /// Read config from the environment. `.env` is loaded first if present.
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL is not set".into()))?;
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        Ok(Config {
            database_url,
            bind_addr,
            max_connections,
        })
    }
}
