use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free health counters for the upstream provider.
#[derive(Debug)]
pub struct ProviderStats {
    pub request_count: AtomicU64,
    pub error_count: AtomicU64,
    // EWMA of latency, stored as microseconds for atomic updates
    pub ewma_latency_us: AtomicU64,
    pub consec_errors: AtomicU32,
    // Unix millis of the most recent failure; drives breaker recovery
    pub last_failure_ms: AtomicU64,
}

impl ProviderStats {
    pub fn new() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            ewma_latency_us: AtomicU64::new(0),
            consec_errors: AtomicU32::new(0),
            last_failure_ms: AtomicU64::new(0),
        }
    }

    pub fn record_success(&self, latency: Duration) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.consec_errors.store(0, Ordering::Relaxed);

        let latency_us = latency.as_micros() as u64;

        // Integer EWMA: new_avg = (old_avg * 7 + sample) / 8 (alpha = 1/8).
        let mut old = self.ewma_latency_us.load(Ordering::Relaxed);
        loop {
            let new_val = if old == 0 {
                latency_us
            } else {
                (old * 7 + latency_us) / 8
            };

            match self.ewma_latency_us.compare_exchange_weak(
                old,
                new_val,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => old = x,
            }
        }
    }

    pub fn record_failure(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.consec_errors.fetch_add(1, Ordering::Relaxed);
        self.last_failure_ms.store(
            chrono::Utc::now().timestamp_millis() as u64,
            Ordering::Relaxed,
        );
    }
}

impl Default for ProviderStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_resets_consecutive_errors() {
        let stats = ProviderStats::new();
        stats.record_failure();
        stats.record_failure();
        assert_eq!(stats.consec_errors.load(Ordering::Relaxed), 2);

        stats.record_success(Duration::from_millis(100));
        assert_eq!(stats.consec_errors.load(Ordering::Relaxed), 0);
        assert_eq!(stats.request_count.load(Ordering::Relaxed), 3);
        assert_eq!(stats.error_count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn ewma_converges_toward_recent_samples() {
        let stats = ProviderStats::new();
        stats.record_success(Duration::from_millis(100));
        assert_eq!(stats.ewma_latency_us.load(Ordering::Relaxed), 100_000);

        for _ in 0..50 {
            stats.record_success(Duration::from_millis(20));
        }
        let ewma = stats.ewma_latency_us.load(Ordering::Relaxed);
        assert!(ewma < 30_000, "ewma {} should approach 20ms", ewma);
    }
}
