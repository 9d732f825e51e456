//! Cache Warmer Background Job
//!
//! Precomputes hybrid recommendations for users who were active in the
//! recent activity window, so their next read is a cache hit.
//!
//! Candidates are ranked by number of actions in the window (user id
//! ascending on ties) and capped per cycle.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::config::CacheWarmerConfig;
use crate::models::UserId;
use crate::services::{BehaviorAnalytics, RecommendationService};
use crate::store::{BehaviorStore, StoreResult};

/// Initial delay to let the first model rebuild finish
const STARTUP_DELAY: Duration = Duration::from_secs(30);

/// Start the cache warmer background job
pub async fn start_cache_warmer(
    service: RecommendationService,
    behaviors: Arc<dyn BehaviorStore>,
    config: CacheWarmerConfig,
) {
    if !config.enabled {
        tracing::info!("Cache warmer disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.warm_interval.as_secs(),
        max_users = config.max_users_per_cycle,
        activity_window_hours = config.activity_window_hours,
        "Starting cache warmer background job"
    );

    let analytics = BehaviorAnalytics::new(behaviors);
    sleep(STARTUP_DELAY).await;

    loop {
        let cycle_start = Instant::now();

        match run_warm_cycle(&service, &analytics, &config).await {
            Ok(warmed_count) => {
                tracing::info!(
                    users_warmed = warmed_count,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "Cache warm cycle completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "Cache warm cycle failed"
                );
            }
        }

        sleep(config.warm_interval).await;
    }
}

/// Run a single cache warming cycle; returns the number of users warmed
async fn run_warm_cycle(
    service: &RecommendationService,
    analytics: &BehaviorAnalytics,
    config: &CacheWarmerConfig,
) -> StoreResult<usize> {
    let candidates = get_warm_candidates(analytics, config).await?;

    if candidates.is_empty() {
        tracing::debug!("No warm candidates found");
        return Ok(0);
    }

    tracing::debug!(candidates = candidates.len(), "Found cache warm candidates");

    let limit = service.config().default_limit as i64;
    for &user_id in &candidates {
        let warmed = service.get_hybrid_recommendations(user_id, limit).await;
        tracing::trace!(user_id, count = warmed.len(), "Warmed hybrid recommendations");
    }

    Ok(candidates.len())
}

async fn get_warm_candidates(
    analytics: &BehaviorAnalytics,
    config: &CacheWarmerConfig,
) -> StoreResult<Vec<UserId>> {
    let end = Utc::now();
    let start = end - chrono::Duration::hours(config.activity_window_hours);

    let users = analytics
        .active_users_between(start, end, config.max_users_per_cycle)
        .await?;
    Ok(users.into_iter().map(|(user_id, _)| user_id).collect())
}
