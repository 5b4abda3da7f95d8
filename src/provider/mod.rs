pub mod stats;

use crate::model::{ProviderConfig, SuggestionRequest};
use crate::provider::stats::ProviderStats;
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// Breaker trips after this many consecutive failures...
pub(crate) const CONSEC_ERROR_LIMIT: u32 = 5;
// ...and lets trial traffic through again after this long without a failure.
pub(crate) const RECOVERY_COOLDOWN_MS: u64 = 30_000;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("upstream response missing `suggestions` field")]
    MalformedResponse,
}

/// Client for the upstream suggestion API.
#[derive(Debug)]
pub struct Provider {
    pub config: ProviderConfig,
    pub stats: Arc<ProviderStats>,
    client: reqwest::Client,
}

impl Provider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config,
            stats: Arc::new(ProviderStats::new()),
            client,
        })
    }

    /// Circuit-breaker check. 5 consecutive errors marks the upstream down;
    /// once the cooldown since the last failure elapses, requests are let
    /// through again so a recovered upstream can reset the counter. Another
    /// failure during that trial re-arms the cooldown.
    pub fn is_healthy(&self) -> bool {
        if self.stats.consec_errors.load(Ordering::Relaxed) < CONSEC_ERROR_LIMIT {
            return true;
        }
        let last_failure = self.stats.last_failure_ms.load(Ordering::Relaxed);
        chrono::Utc::now().timestamp_millis() as u64 >= last_failure + RECOVERY_COOLDOWN_MS
    }

    /// Calls the upstream suggestion endpoint and returns the suggestion
    /// payload. Stats recording is the caller's job so cache hits never touch
    /// the counters.
    pub async fn suggest(&self, req: &SuggestionRequest) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .post(&self.config.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key),
            )
            .json(req)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderError::Status(resp.status()));
        }

        let body: Value = resp.json().await?;
        body.get("suggestions")
            .cloned()
            .ok_or(ProviderError::MalformedResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Provider {
        Provider::new(ProviderConfig {
            name: "test".to_string(),
            endpoint: "http://127.0.0.1:9/suggest".to_string(),
            api_key: "test".to_string(),
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn breaker_trips_after_consecutive_failures() {
        let p = provider();
        for _ in 0..CONSEC_ERROR_LIMIT {
            assert!(p.is_healthy());
            p.stats.record_failure();
        }
        assert!(!p.is_healthy());
    }

    #[test]
    fn breaker_reopens_after_cooldown_and_resets_on_success() {
        let p = provider();
        for _ in 0..CONSEC_ERROR_LIMIT {
            p.stats.record_failure();
        }
        assert!(!p.is_healthy());

        // Age the last failure past the cooldown: trial traffic is allowed
        // again even though the error counter is still at the limit.
        let last = p.stats.last_failure_ms.load(Ordering::Relaxed);
        p.stats
            .last_failure_ms
            .store(last - RECOVERY_COOLDOWN_MS, Ordering::Relaxed);
        assert!(p.is_healthy());

        // A successful trial fully closes the loop.
        p.stats.record_success(Duration::from_millis(50));
        assert_eq!(p.stats.consec_errors.load(Ordering::Relaxed), 0);
        assert!(p.is_healthy());

        // A failed trial re-arms the cooldown instead.
        p.stats.record_failure();
        for _ in 0..CONSEC_ERROR_LIMIT {
            p.stats.record_failure();
        }
        assert!(!p.is_healthy());
    }
}
