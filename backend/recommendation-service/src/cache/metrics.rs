//! Cache metrics for observability

use prometheus::{IntCounterVec, Opts, Registry};

/// Hit/miss/write/invalidation counters, labeled by cache namespace.
///
/// Cloning shares the underlying counters.
#[derive(Clone)]
pub struct CacheMetrics {
    hits: IntCounterVec,
    misses: IntCounterVec,
    writes: IntCounterVec,
    invalidations: IntCounterVec,
}

fn counter(name: &str, help: &str) -> IntCounterVec {
    IntCounterVec::new(Opts::new(name, help), &["namespace"]).expect("valid metric definition")
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self {
            hits: counter("rec_cache_hits_total", "Total cache hits"),
            misses: counter("rec_cache_misses_total", "Total cache misses"),
            writes: counter("rec_cache_writes_total", "Total cache writes"),
            invalidations: counter(
                "rec_cache_invalidations_total",
                "Total cache entries removed by invalidation",
            ),
        }
    }

    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.invalidations.clone()))?;
        Ok(())
    }

    pub fn record_hit(&self, namespace: &str) {
        self.hits.with_label_values(&[namespace]).inc();
    }

    pub fn record_miss(&self, namespace: &str) {
        self.misses.with_label_values(&[namespace]).inc();
    }

    pub fn record_write(&self, namespace: &str) {
        self.writes.with_label_values(&[namespace]).inc();
    }

    pub fn record_invalidations(&self, namespace: &str, count: usize) {
        self.invalidations
            .with_label_values(&[namespace])
            .inc_by(count as u64);
    }

    pub fn hits(&self, namespace: &str) -> u64 {
        self.hits.with_label_values(&[namespace]).get()
    }

    pub fn misses(&self, namespace: &str) -> u64 {
        self.misses.with_label_values(&[namespace]).get()
    }

    pub fn writes(&self, namespace: &str) -> u64 {
        self.writes.with_label_values(&[namespace]).get()
    }

    pub fn invalidations(&self, namespace: &str) -> u64 {
        self.invalidations.with_label_values(&[namespace]).get()
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}
