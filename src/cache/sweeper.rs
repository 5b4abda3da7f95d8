use crate::cache::SuggestionCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Spawns the periodic expiry sweep.
///
/// Runs forever: sweep, sleep `interval`, repeat. A failed sweep is logged
/// and retried after the shorter `retry_backoff` instead of waiting a full
/// interval; it never takes down the host process.
pub fn spawn(
    cache: Arc<SuggestionCache>,
    interval: Duration,
    retry_backoff: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let delay = match cache.sweep_expired() {
                Ok(removed) => {
                    info!(removed, "cache sweep completed");
                    interval
                }
                Err(e) => {
                    error!("cache sweep failed, will retry: {}", e);
                    retry_backoff
                }
            };
            tokio::time::sleep(delay).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SuggestionType;
    use serde_json::json;

    #[tokio::test]
    async fn sweeper_runs_an_initial_sweep_before_sleeping() {
        let cache = Arc::new(SuggestionCache::new(chrono::Duration::days(7)));
        cache.put(
            "dead",
            SuggestionType::Causes,
            json!(["x"]),
            chrono::Duration::milliseconds(-1),
        );
        cache.put(
            "live",
            SuggestionType::Causes,
            json!(["y"]),
            chrono::Duration::days(7),
        );

        let handle = spawn(
            cache.clone(),
            Duration::from_secs(60),
            Duration::from_secs(5),
        );

        // First sweep runs before the first interval sleep.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.entries.len(), 1);
        assert_eq!(cache.get("live"), Some(json!(["y"])));

        handle.abort();
    }
}
