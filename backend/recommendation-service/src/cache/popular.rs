use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::CacheMetrics;
use crate::models::Item;
use crate::store::{ItemCatalog, StoreResult};

const NAMESPACE: &str = "popular";

struct PopularSnapshot {
    items: Arc<Vec<Item>>,
    built_at: Option<Instant>,
}

/// Top-N roles by global popularity.
///
/// Readers get the latest snapshot. The snapshot is rebuilt on a timer or
/// on model refresh; a read that finds it missing or past its TTL rebuilds
/// inline and, if that fails, keeps serving the old snapshot.
pub struct PopularItems {
    catalog: Arc<dyn ItemCatalog>,
    size: usize,
    ttl: Duration,
    snapshot: RwLock<PopularSnapshot>,
    metrics: CacheMetrics,
}

impl PopularItems {
    pub fn new(
        catalog: Arc<dyn ItemCatalog>,
        size: usize,
        ttl: Duration,
        metrics: CacheMetrics,
    ) -> Self {
        Self {
            catalog,
            size,
            ttl,
            snapshot: RwLock::new(PopularSnapshot {
                items: Arc::new(Vec::new()),
                built_at: None,
            }),
            metrics,
        }
    }

    /// Rank by popularity descending; ties keep catalog order
    pub fn rank(mut items: Vec<Item>, size: usize) -> Vec<Item> {
        items.sort_by(|a, b| b.popularity.cmp(&a.popularity));
        items.truncate(size);
        items
    }

    /// Rebuild the snapshot from the catalog. Returns the snapshot size.
    pub async fn refresh(&self) -> StoreResult<usize> {
        let items = self.catalog.list_all_items().await?;
        let ranked = Self::rank(items, self.size);
        let count = ranked.len();

        {
            let mut snapshot = self.snapshot.write();
            snapshot.items = Arc::new(ranked);
            snapshot.built_at = Some(Instant::now());
        }
        self.metrics.record_write(NAMESPACE);

        info!(popular_count = count, "Popular roles snapshot rebuilt");
        Ok(count)
    }

    fn current(&self) -> (Arc<Vec<Item>>, bool) {
        let snapshot = self.snapshot.read();
        let fresh = snapshot
            .built_at
            .map(|at| at.elapsed() < self.ttl)
            .unwrap_or(false);
        (snapshot.items.clone(), fresh)
    }

    /// Up to `limit` popular roles
    pub async fn top(&self, limit: usize) -> Vec<Item> {
        let (items, fresh) = self.current();
        if fresh {
            self.metrics.record_hit(NAMESPACE);
            return items.iter().take(limit).cloned().collect();
        }

        self.metrics.record_miss(NAMESPACE);
        match self.refresh().await {
            Ok(_) => {
                let (items, _) = self.current();
                items.iter().take(limit).cloned().collect()
            }
            Err(e) => {
                warn!(
                    error = %e,
                    stale_count = items.len(),
                    "Popular roles rebuild failed, serving stale snapshot"
                );
                items.iter().take(limit).cloned().collect()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn age(&self) -> Option<Duration> {
        self.snapshot.read().built_at.map(|at| at.elapsed())
    }
}
