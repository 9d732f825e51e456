//! Prometheus metrics owned by one `RecommendationService` instance.
//!
//! Each service gets its own registry so tests can build fresh instances
//! without colliding on global collectors.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

use crate::cache::CacheMetrics;

#[derive(Clone)]
pub struct RecommendationMetrics {
    registry: Registry,
    pub cache: CacheMetrics,
    fallbacks: IntCounterVec,
    hybrid_timeouts: IntCounterVec,
    recompute_failures: IntCounter,
}

impl RecommendationMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let cache = CacheMetrics::new();
        cache.register(&registry)?;

        let fallbacks = IntCounterVec::new(
            Opts::new(
                "rec_fallbacks_total",
                "Requests answered with the popular-roles fallback",
            ),
            &["strategy", "reason"],
        )?;
        let hybrid_timeouts = IntCounterVec::new(
            Opts::new(
                "rec_hybrid_timeouts_total",
                "Hybrid sub-strategies dropped for missing the deadline",
            ),
            &["strategy"],
        )?;
        let recompute_failures = IntCounter::new(
            "rec_preference_recompute_failures_total",
            "Background preference vector recomputations that failed",
        )?;

        registry.register(Box::new(fallbacks.clone()))?;
        registry.register(Box::new(hybrid_timeouts.clone()))?;
        registry.register(Box::new(recompute_failures.clone()))?;

        Ok(Self {
            registry,
            cache,
            fallbacks,
            hybrid_timeouts,
            recompute_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_fallback(&self, strategy: &str, reason: &str) {
        self.fallbacks.with_label_values(&[strategy, reason]).inc();
    }

    pub fn record_hybrid_timeout(&self, strategy: &str) {
        self.hybrid_timeouts.with_label_values(&[strategy]).inc();
    }

    pub fn record_recompute_failure(&self) {
        self.recompute_failures.inc();
    }

    pub fn fallbacks(&self, strategy: &str, reason: &str) -> u64 {
        self.fallbacks.with_label_values(&[strategy, reason]).get()
    }

    pub fn hybrid_timeouts(&self, strategy: &str) -> u64 {
        self.hybrid_timeouts.with_label_values(&[strategy]).get()
    }

    pub fn recompute_failures(&self) -> u64 {
        self.recompute_failures.get()
    }
}
