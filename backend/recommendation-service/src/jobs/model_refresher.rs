//! Periodic model refresh
//!
//! Rebuilds the popular-roles snapshot and flushes per-user caches on a
//! fixed interval. The worker runs one rebuild at startup, so the first
//! cycle waits a full interval.

use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::config::RecommendationConfig;
use crate::services::RecommendationService;

/// Every 10 minutes
const REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct ModelRefresherConfig {
    pub interval: Duration,
}

impl Default for ModelRefresherConfig {
    fn default() -> Self {
        Self {
            interval: REFRESH_INTERVAL,
        }
    }
}

impl From<&RecommendationConfig> for ModelRefresherConfig {
    fn from(config: &RecommendationConfig) -> Self {
        Self {
            interval: config.refresh_interval,
        }
    }
}

/// Start the model refresher background job. Never returns.
pub async fn start_model_refresher(service: RecommendationService, config: ModelRefresherConfig) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        "Starting model refresher background job"
    );

    loop {
        sleep(config.interval).await;
        run_refresh_cycle(&service).await;
    }
}

async fn run_refresh_cycle(service: &RecommendationService) {
    let cycle_start = Instant::now();

    match service.rebuild_model().await {
        Ok(popular_count) => {
            tracing::info!(
                popular_count,
                duration_ms = cycle_start.elapsed().as_millis() as u64,
                "Model refresh cycle completed"
            );
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                duration_ms = cycle_start.elapsed().as_millis() as u64,
                "Model refresh cycle failed"
            );
        }
    }
}
