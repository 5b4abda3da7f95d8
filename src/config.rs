use crate::model::ProviderConfig;
use anyhow::{Context, Result};
use std::net::SocketAddr;

/// Runtime configuration, read from the environment with fixed defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub provider: ProviderConfig,
    /// How long a cached response stays live. Default 7 days.
    pub cache_ttl_secs: u64,
    /// Interval between expiry sweeps. Default 24h.
    pub sweep_interval_secs: u64,
    /// Backoff before retrying a failed sweep. Default 1h.
    pub sweep_retry_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_or(key, default)
        .parse()
        .with_context(|| format!("invalid value for {}", key))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            listen_addr: env_parse("SUGGEST_EDGE_ADDR", "127.0.0.1:8080")?,
            provider: ProviderConfig {
                name: env_or("PROVIDER_NAME", "gemini"),
                endpoint: env_or("PROVIDER_ENDPOINT", "http://localhost:3001/suggest"),
                api_key: env_or("PROVIDER_API_KEY", ""),
                timeout_secs: env_parse("PROVIDER_TIMEOUT_SECS", "10")?,
            },
            cache_ttl_secs: env_parse("CACHE_TTL_SECS", "604800")?,
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", "86400")?,
            sweep_retry_secs: env_parse("SWEEP_RETRY_SECS", "3600")?,
        })
    }
}
