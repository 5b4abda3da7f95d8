pub mod fingerprint;
pub mod sweeper;

use crate::model::SuggestionType;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One cached upstream response, keyed by request fingerprint.
#[derive(Debug, Clone)]
struct CacheEntry {
    suggestion_type: SuggestionType,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    access_count: u64,
    last_accessed_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: u64,
    pub total_hits: u64,
    pub total_misses: u64,
    pub avg_hits_per_entry: f64,
    pub type_distribution: BTreeMap<String, u64>,
    pub last_24h_entries: u64,
    pub last_7d_entries: u64,
    pub ttl_secs: u64,
}

/// TTL cache for upstream suggestion responses.
///
/// Entries past their expiry are logically absent: `get` evicts them on read,
/// and a periodic sweep removes the rest. Writers racing on one key simply
/// overwrite each other; entries are idempotent re-derivations of the same
/// upstream call, so last-writer-wins is correct enough.
pub struct SuggestionCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SuggestionCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Looks up a live entry. Returns `None` for absent or expired keys; on a
    /// hit, bumps the entry's access stats as an observable side effect.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = Utc::now();

        if let Some(mut entry) = self.entries.get_mut(key) {
            if !entry.is_expired(now) {
                entry.access_count += 1;
                entry.last_accessed_at = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.payload.clone());
            }
        }

        // Evict-on-read: an expired entry is logically absent already.
        if self
            .entries
            .remove_if(key, |_, e| e.is_expired(now))
            .is_some()
        {
            debug!(key, "evicted expired entry on read");
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Inserts or overwrites the entry for `key` with a fresh expiry.
    pub fn put(
        &self,
        key: &str,
        suggestion_type: SuggestionType,
        payload: serde_json::Value,
        ttl: Duration,
    ) {
        let now = Utc::now();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                suggestion_type,
                payload,
                created_at: now,
                expires_at: now + ttl,
                access_count: 0,
                last_accessed_at: now,
            },
        );
    }

    /// Removes every entry past its expiry and returns the count removed.
    ///
    /// Typed fallible so the sweeper's retry/backoff contract holds if the
    /// store ever grows a failure mode; the in-memory map cannot fail.
    pub fn sweep_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before.saturating_sub(self.entries.len()))
    }

    /// Aggregate report over live and not-yet-swept entries. No side effects.
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let day_ago = now - Duration::hours(24);
        let week_ago = now - Duration::days(7);

        let mut total_entries: u64 = 0;
        let mut entry_accesses: u64 = 0;
        let mut last_24h_entries: u64 = 0;
        let mut last_7d_entries: u64 = 0;
        let mut type_distribution: BTreeMap<String, u64> = BTreeMap::new();

        for entry in self.entries.iter() {
            if entry.is_expired(now) {
                continue;
            }
            total_entries += 1;
            entry_accesses += entry.access_count;
            if entry.created_at > day_ago {
                last_24h_entries += 1;
            }
            if entry.created_at > week_ago {
                last_7d_entries += 1;
            }
            *type_distribution
                .entry(entry.suggestion_type.to_string())
                .or_insert(0) += 1;
        }

        let avg_hits_per_entry = if total_entries > 0 {
            entry_accesses as f64 / total_entries as f64
        } else {
            0.0
        };

        CacheStats {
            total_entries,
            total_hits: self.hits.load(Ordering::Relaxed),
            total_misses: self.misses.load(Ordering::Relaxed),
            avg_hits_per_entry: (avg_hits_per_entry * 100.0).round() / 100.0,
            type_distribution,
            last_24h_entries,
            last_7d_entries,
            ttl_secs: self.default_ttl.num_seconds().max(0) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> SuggestionCache {
        SuggestionCache::new(Duration::days(7))
    }

    #[test]
    fn get_on_unknown_key_is_a_miss() {
        let c = cache();
        assert_eq!(c.get("no-such-key"), None);
        assert_eq!(c.stats().total_misses, 1);
        assert_eq!(c.stats().total_hits, 0);
    }

    #[test]
    fn put_then_get_round_trips_until_expiry() {
        let c = cache();
        let payload = json!([{"description": "blocked outlet", "confidence": 0.8}]);

        c.put(
            "k1",
            SuggestionType::Causes,
            payload.clone(),
            Duration::milliseconds(80),
        );
        assert_eq!(c.get("k1"), Some(payload));

        std::thread::sleep(std::time::Duration::from_millis(120));
        assert_eq!(c.get("k1"), None);
        // Evicted on read, physically gone too.
        assert!(!c.entries.contains_key("k1"));
    }

    #[test]
    fn put_overwrites_in_place() {
        let c = cache();
        c.put("k1", SuggestionType::Safeguards, json!(["v1"]), Duration::days(7));
        c.put("k1", SuggestionType::Safeguards, json!(["v2"]), Duration::days(7));

        assert_eq!(c.entries.len(), 1);
        assert_eq!(c.get("k1"), Some(json!(["v2"])));
    }

    #[test]
    fn repeated_hits_increase_access_count() {
        let c = cache();
        c.put("k1", SuggestionType::Causes, json!(["x"]), Duration::days(7));

        for expected in 1..=3u64 {
            c.get("k1");
            let entry = c.entries.get("k1").unwrap();
            assert_eq!(entry.access_count, expected);
        }
        assert_eq!(c.stats().total_hits, 3);
    }

    #[test]
    fn hit_refreshes_last_accessed() {
        let c = cache();
        c.put("k1", SuggestionType::Causes, json!(["x"]), Duration::days(7));
        let before = c.entries.get("k1").unwrap().last_accessed_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        c.get("k1");
        let after = c.entries.get("k1").unwrap().last_accessed_at;
        assert!(after > before);
    }

    #[test]
    fn sweep_removes_all_and_only_expired_entries() {
        let c = cache();
        c.put("live", SuggestionType::Causes, json!(["a"]), Duration::days(7));
        c.put(
            "dead1",
            SuggestionType::Safeguards,
            json!(["b"]),
            Duration::milliseconds(-1),
        );
        c.put(
            "dead2",
            SuggestionType::Consequences,
            json!(["c"]),
            Duration::milliseconds(-1),
        );

        assert_eq!(c.sweep_expired().unwrap(), 2);
        assert_eq!(c.entries.len(), 1);
        assert!(c.entries.contains_key("live"));

        // Idempotent: nothing left to sweep.
        assert_eq!(c.sweep_expired().unwrap(), 0);
    }

    #[test]
    fn stats_aggregate_by_type_and_age() {
        let c = cache();
        c.put("k1", SuggestionType::Causes, json!(["a"]), Duration::days(7));
        c.put("k2", SuggestionType::Causes, json!(["b"]), Duration::days(7));
        c.put("k3", SuggestionType::CompleteAnalysis, json!(["c"]), Duration::days(7));
        c.put(
            "expired",
            SuggestionType::Safeguards,
            json!(["d"]),
            Duration::milliseconds(-1),
        );

        c.get("k1");
        c.get("k1");
        c.get("missing");

        let stats = c.stats();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.total_hits, 2);
        assert_eq!(stats.total_misses, 1);
        assert_eq!(stats.type_distribution.get("causes"), Some(&2));
        assert_eq!(stats.type_distribution.get("complete_analysis"), Some(&1));
        assert_eq!(stats.type_distribution.get("safeguards"), None);
        assert_eq!(stats.last_24h_entries, 3);
        assert_eq!(stats.last_7d_entries, 3);
        assert!((stats.avg_hits_per_entry - 0.67).abs() < 1e-9);
    }
}
