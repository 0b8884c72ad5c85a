//! Environment configuration

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{LocalCache, DEFAULT_CAPACITY};
use crate::error::AppError;
use crate::pricing::{HttpRemoteStore, PriceRepository};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the remote price store, for engine clients
    pub remote_url: Option<String>,
    pub remote_timeout: Duration,
    /// PostgreSQL store of the service; in-memory when unset
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub cache_capacity: u64,
}

impl AppConfig {
    /// Read configuration from the environment, loading `.env` if present
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let remote_timeout_secs = match non_empty("PRICING_REMOTE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Config(format!("PRICING_REMOTE_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            None => DEFAULT_REMOTE_TIMEOUT_SECS,
        };

        let bind_addr = non_empty("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is invalid: {}", e)))?;

        let cache_capacity = match non_empty("PRICING_CACHE_CAPACITY") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Config(format!("PRICING_CACHE_CAPACITY is not a number: {}", raw))
            })?,
            None => DEFAULT_CAPACITY,
        };

        Ok(Self {
            remote_url: non_empty("PRICING_REMOTE_URL"),
            remote_timeout: Duration::from_secs(remote_timeout_secs),
            database_url: non_empty("DATABASE_URL"),
            bind_addr,
            cache_capacity,
        })
    }

    /// Engine-side repository talking to the configured price store
    pub fn client_repository(&self) -> Result<PriceRepository, AppError> {
        let url = self
            .remote_url
            .as_deref()
            .ok_or_else(|| AppError::Config("PRICING_REMOTE_URL is not set".to_string()))?;
        let remote = HttpRemoteStore::new(url, self.remote_timeout)?;
        Ok(PriceRepository::new(
            LocalCache::new(self.cache_capacity),
            Arc::new(remote),
        ))
    }
}
