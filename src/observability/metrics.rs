//! Metrics registry for objql
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe but lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by every query built on the same context.
///
/// All counters use Relaxed ordering; values are exact once the writers
/// have finished.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_executed: AtomicU64,
    queries_failed: AtomicU64,
    objects_scanned: AtomicU64,
    rows_returned: AtomicU64,
    comparisons: AtomicU64,
    sort_cache_hits: AtomicU64,
    getter_compilations: AtomicU64,
    like_compilations: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Query metrics

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_objects_scanned(&self, count: u64) {
        self.objects_scanned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_rows_returned(&self, count: u64) {
        self.rows_returned.fetch_add(count, Ordering::Relaxed);
    }

    // Ordering metrics

    pub fn add_comparisons(&self, count: u64) {
        self.comparisons.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_sort_cache_hits(&self, count: u64) {
        self.sort_cache_hits.fetch_add(count, Ordering::Relaxed);
    }

    // Cache metrics

    pub fn add_getter_compilations(&self, count: u64) {
        self.getter_compilations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_like_compilations(&self) {
        self.like_compilations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            objects_scanned: self.objects_scanned.load(Ordering::Relaxed),
            rows_returned: self.rows_returned.load(Ordering::Relaxed),
            comparisons: self.comparisons.load(Ordering::Relaxed),
            sort_cache_hits: self.sort_cache_hits.load(Ordering::Relaxed),
            getter_compilations: self.getter_compilations.load(Ordering::Relaxed),
            like_compilations: self.like_compilations.load(Ordering::Relaxed),
        }
    }

    /// Current values as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub queries_failed: u64,
    pub objects_scanned: u64,
    pub rows_returned: u64,
    pub comparisons: u64,
    pub sort_cache_hits: u64,
    pub getter_compilations: u64,
    pub like_compilations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.queries_executed, 0);
        assert_eq!(snapshot.comparisons, 0);
        assert_eq!(snapshot.like_compilations, 0);
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();

        registry.increment_queries_executed();
        registry.increment_queries_failed();
        registry.add_objects_scanned(10);
        registry.add_rows_returned(4);
        registry.add_comparisons(25);
        registry.add_sort_cache_hits(20);
        registry.increment_like_compilations();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.queries_executed, 1);
        assert_eq!(snapshot.queries_failed, 1);
        assert_eq!(snapshot.objects_scanned, 10);
        assert_eq!(snapshot.rows_returned, 4);
        assert_eq!(snapshot.comparisons, 25);
        assert_eq!(snapshot.sort_cache_hits, 20);
        assert_eq!(snapshot.like_compilations, 1);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.add_objects_scanned(1234);

        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["objects_scanned"], 1234);
        assert_eq!(parsed["queries_executed"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.add_comparisons(1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.snapshot().comparisons, 1000);
    }
}
