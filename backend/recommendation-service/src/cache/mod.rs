//! In-process caching layer for recommendation results
//!
//! - Strategy results: `CacheKey` → ranked roles, TTL 5 minutes
//! - Preference vectors: user id → `PreferenceVector`, TTL 5 minutes
//! - Popular roles: single snapshot, TTL 30 minutes, rebuilt on a timer
//!
//! Each namespace is guarded by one lock, so an invalidation sweep is
//! atomic with respect to readers of that namespace.

mod keys;
mod metrics;
mod popular;

pub use keys::{CacheKey, CACHE_VERSION};
pub use metrics::CacheMetrics;
pub use popular::PopularItems;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::UserId;

/// Keys whose entries belong to exactly one user
pub trait UserScoped {
    fn owner(&self) -> UserId;
}

impl UserScoped for UserId {
    fn owner(&self) -> UserId {
        *self
    }
}

impl UserScoped for CacheKey {
    fn owner(&self) -> UserId {
        self.user_id
    }
}

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) < self.ttl
    }
}

/// Generation observed when a computation started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    epoch: u64,
    user: u64,
}

struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Bumped by `clear`
    epoch: u64,
    /// Bumped per user by `invalidate_user`; reset when the epoch moves
    generations: HashMap<UserId, u64>,
}

impl<K, V> CacheState<K, V> {
    fn stamp(&self, user_id: UserId) -> Stamp {
        Stamp {
            epoch: self.epoch,
            user: self.generations.get(&user_id).copied().unwrap_or(0),
        }
    }
}

/// TTL-keyed memoization for one cache namespace.
///
/// A computation that started before its user was invalidated (or before
/// the namespace was cleared) is returned to the caller but never written
/// back. Invalidating one user does not affect in-flight computations for
/// anyone else.
pub struct TtlCache<K, V> {
    namespace: &'static str,
    default_ttl: Duration,
    state: RwLock<CacheState<K, V>>,
    metrics: CacheMetrics,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + UserScoped,
    V: Clone,
{
    pub fn new(namespace: &'static str, default_ttl: Duration, metrics: CacheMetrics) -> Self {
        Self {
            namespace,
            default_ttl,
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                epoch: 0,
                generations: HashMap::new(),
            }),
            metrics,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Live value for `key`; expired entries count as a miss
    pub fn get(&self, key: &K) -> Option<V> {
        let state = self.state.read();
        match state.entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => {
                self.metrics.record_hit(self.namespace);
                Some(entry.value.clone())
            }
            _ => {
                self.metrics.record_miss(self.namespace);
                None
            }
        }
    }

    fn insert_if_current(&self, key: K, value: V, ttl: Duration, started: Stamp) {
        let mut state = self.state.write();
        if state.stamp(key.owner()) != started {
            debug!(
                namespace = self.namespace,
                user_id = key.owner(),
                "Skipping cache write, invalidated during computation"
            );
            return;
        }
        state.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
        self.metrics.record_write(self.namespace);
    }

    /// Return the live entry, or run `compute` and store its result.
    /// Errors are returned and not cached.
    pub async fn get_or_try_compute<F, Fut, E>(
        &self,
        key: K,
        ttl: Duration,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let started = self.state.read().stamp(key.owner());
        let value = compute().await?;
        self.insert_if_current(key, value.clone(), ttl, started);
        Ok(value)
    }

    /// Remove every entry of `user_id` under a single write lock
    pub fn invalidate_user(&self, user_id: UserId) -> usize {
        let mut state = self.state.write();
        let before = state.entries.len();
        state.entries.retain(|k, _| k.owner() != user_id);
        *state.generations.entry(user_id).or_insert(0) += 1;
        let removed = before - state.entries.len();
        if removed > 0 {
            self.metrics.record_invalidations(self.namespace, removed);
        }
        removed
    }

    /// Remove every entry and block all in-flight write-backs
    pub fn clear(&self) -> usize {
        let mut state = self.state.write();
        let removed = state.entries.len();
        state.entries.clear();
        state.generations.clear();
        state.epoch += 1;
        if removed > 0 {
            self.metrics.record_invalidations(self.namespace, removed);
        }
        removed
    }

    /// Number of stored entries, including expired ones
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Strategy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn cache(ttl: Duration) -> TtlCache<CacheKey, Vec<i64>> {
        TtlCache::new("test", ttl, CacheMetrics::new())
    }

    fn key(user_id: UserId) -> CacheKey {
        CacheKey::new(Strategy::Personalized, user_id, 10)
    }

    async fn fill(cache: &TtlCache<CacheKey, Vec<i64>>, key: CacheKey, value: Vec<i64>) {
        let ttl = cache.default_ttl();
        let stored: Result<_, ()> = cache
            .get_or_try_compute(key, ttl, || async move { Ok(value) })
            .await;
        assert!(stored.is_ok());
    }

    #[tokio::test]
    async fn test_get_or_try_compute_memoizes() {
        let cache = cache(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<_, ()> = cache
                .get_or_try_compute(key(1), Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await;
            assert_eq!(value, Ok(vec![1, 2, 3]));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.metrics.hits("test"), 2);
        assert_eq!(cache.metrics.misses("test"), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_recomputed() {
        let cache = cache(Duration::from_millis(20));
        fill(&cache, key(1), vec![1]).await;
        assert_eq!(cache.get(&key(1)), Some(vec![1]));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get(&key(1)), None);

        fill(&cache, key(1), vec![2]).await;
        assert_eq!(cache.get(&key(1)), Some(vec![2]));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = cache(Duration::from_secs(60));
        let result: Result<Vec<i64>, &str> = cache
            .get_or_try_compute(key(1), Duration::from_secs(60), || async { Err("boom") })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_user_removes_that_user_only() {
        let cache = cache(Duration::from_secs(60));
        fill(&cache, key(1), vec![1]).await;
        fill(&cache, CacheKey::new(Strategy::Hybrid, 1, 5), vec![1]).await;
        fill(&cache, key(11), vec![11]).await;

        assert_eq!(cache.invalidate_user(1), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key(11)), Some(vec![11]));
        assert_eq!(cache.metrics.invalidations("test"), 2);
    }

    #[tokio::test]
    async fn test_invalidating_the_user_during_compute_skips_write_back() {
        let cache = Arc::new(cache(Duration::from_secs(60)));
        let inner = cache.clone();

        let value: Result<_, ()> = cache
            .get_or_try_compute(key(1), Duration::from_secs(60), || async move {
                inner.invalidate_user(1);
                Ok(vec![9])
            })
            .await;

        assert_eq!(value, Ok(vec![9]));
        assert!(cache.get(&key(1)).is_none());
    }

    #[tokio::test]
    async fn test_invalidating_another_user_during_compute_keeps_write_back() {
        let cache = Arc::new(cache(Duration::from_secs(60)));
        let inner = cache.clone();

        let value: Result<_, ()> = cache
            .get_or_try_compute(key(2), Duration::from_secs(60), || async move {
                inner.invalidate_user(1);
                Ok(vec![2])
            })
            .await;

        assert_eq!(value, Ok(vec![2]));
        assert_eq!(cache.get(&key(2)), Some(vec![2]));
    }

    #[tokio::test]
    async fn test_clear_during_compute_skips_every_write_back() {
        let cache = Arc::new(cache(Duration::from_secs(60)));
        let inner = cache.clone();
        // User 3 was invalidated before, so its counter is reset by clear
        cache.invalidate_user(3);

        let value: Result<_, ()> = cache
            .get_or_try_compute(key(3), Duration::from_secs(60), || async move {
                inner.clear();
                Ok(vec![3])
            })
            .await;

        assert_eq!(value, Ok(vec![3]));
        assert!(cache.is_empty());

        fill(&cache, key(3), vec![4]).await;
        assert_eq!(cache.get(&key(3)), Some(vec![4]));
    }
}
