//! Recommendation facade
//!
//! Reads never fail: every strategy degrades to the popular-roles list on
//! cold start or upstream errors. Writes (`record_*`, `delete_*`) propagate
//! store failures to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, PopularItems, TtlCache};
use crate::config::RecommendationConfig;
use crate::error::{AppError, Result};
use crate::metrics::RecommendationMetrics;
use crate::models::{ActionType, BehaviorEvent, Item, ItemId, PreferenceVector, Strategy, UserId};
use crate::services::explain::{explain, GENERIC_EXPLANATION};
use crate::services::hybrid::{fuse, HybridWeights};
use crate::services::preference::PreferenceVectorBuilder;
use crate::services::strategies::{
    CollaborativeStrategy, ContentBasedStrategy, Outcome, PersonalizedStrategy,
    RecommendationStrategy,
};
use crate::store::{BehaviorStore, ConversationStore, ItemCatalog, StoreError, StoreResult};

/// Strategies fused by hybrid, in fan-out order
const FUSED_STRATEGIES: [Strategy; 3] = [
    Strategy::Personalized,
    Strategy::ContentBased,
    Strategy::Collaborative,
];

const RESULTS_NAMESPACE: &str = "results";
const PREFERENCES_NAMESPACE: &str = "preferences";

/// A computed list and whether it may be stored in the result cache
struct Resolved {
    items: Vec<Item>,
    cacheable: bool,
}

#[derive(Clone)]
pub struct RecommendationService {
    behaviors: Arc<dyn BehaviorStore>,
    preferences: Arc<PreferenceVectorBuilder>,
    strategies: Arc<Vec<Arc<dyn RecommendationStrategy>>>,
    results: Arc<TtlCache<CacheKey, Vec<Item>>>,
    vectors: Arc<TtlCache<UserId, PreferenceVector>>,
    popular: Arc<PopularItems>,
    weights: HybridWeights,
    metrics: RecommendationMetrics,
    config: RecommendationConfig,
}

impl RecommendationService {
    pub fn new(
        catalog: Arc<dyn ItemCatalog>,
        behaviors: Arc<dyn BehaviorStore>,
        conversations: Arc<dyn ConversationStore>,
        config: RecommendationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let weights = config.weights()?;
        let metrics = RecommendationMetrics::new()?;

        let strategies: Vec<Arc<dyn RecommendationStrategy>> = vec![
            Arc::new(PersonalizedStrategy::new(catalog.clone())),
            Arc::new(ContentBasedStrategy::new(catalog.clone())),
            Arc::new(CollaborativeStrategy::new(
                catalog.clone(),
                behaviors.clone(),
                config.max_similar_users,
            )),
        ];

        let results = TtlCache::new(RESULTS_NAMESPACE, config.cache_ttl, metrics.cache.clone());
        let vectors = TtlCache::new(
            PREFERENCES_NAMESPACE,
            config.cache_ttl,
            metrics.cache.clone(),
        );
        let popular = PopularItems::new(
            catalog.clone(),
            config.popular_size,
            config.popular_ttl,
            metrics.cache.clone(),
        );

        Ok(Self {
            preferences: Arc::new(PreferenceVectorBuilder::new(
                catalog,
                behaviors.clone(),
                conversations,
            )),
            behaviors,
            strategies: Arc::new(strategies),
            results: Arc::new(results),
            vectors: Arc::new(vectors),
            popular: Arc::new(popular),
            weights,
            metrics,
            config,
        })
    }

    pub fn metrics(&self) -> &RecommendationMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    /// `<= 0` means the default limit; anything above the maximum is clamped
    pub fn normalize_limit(&self, limit: i64) -> usize {
        if limit <= 0 {
            return self.config.default_limit;
        }
        usize::try_from(limit)
            .unwrap_or(self.config.max_limit)
            .min(self.config.max_limit)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get_personalized_recommendations(&self, user_id: UserId, limit: i64) -> Vec<Item> {
        let limit = self.normalize_limit(limit);
        self.single(Strategy::Personalized, user_id, limit).await
    }

    pub async fn get_content_based_recommendations(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Vec<Item> {
        let limit = self.normalize_limit(limit);
        self.single(Strategy::ContentBased, user_id, limit).await
    }

    pub async fn get_collaborative_filtering_recommendations(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Vec<Item> {
        let limit = self.normalize_limit(limit);
        self.single(Strategy::Collaborative, user_id, limit).await
    }

    pub async fn get_hybrid_recommendations(&self, user_id: UserId, limit: i64) -> Vec<Item> {
        let limit = self.normalize_limit(limit);
        let key = CacheKey::new(Strategy::Hybrid, user_id, limit);
        self.cached(key, self.compute_hybrid(user_id, limit)).await
    }

    /// Popular roles, independent of any user
    pub async fn popular_items(&self, limit: i64) -> Vec<Item> {
        let limit = self.normalize_limit(limit);
        self.popular.top(limit).await
    }

    /// Best-effort text explaining why these roles were picked
    pub async fn get_recommendation_explanation(
        &self,
        user_id: UserId,
        item_ids: &[ItemId],
    ) -> String {
        match self.preference_vector(user_id).await {
            Ok(vector) => explain(&vector, item_ids.len()),
            Err(e) => {
                warn!(user_id, error = %e, "Explanation fell back to generic text");
                GENERIC_EXPLANATION.to_string()
            }
        }
    }

    pub async fn preference_vector(&self, user_id: UserId) -> StoreResult<PreferenceVector> {
        self.vectors
            .get_or_try_compute(user_id, self.vectors.default_ttl(), || {
                self.preferences.build(user_id)
            })
            .await
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Append an event with a caller-supplied score.
    ///
    /// Unknown action types are stored verbatim. On success the user's cached
    /// results are gone before this returns.
    pub async fn record_user_behavior(
        &self,
        user_id: UserId,
        item_id: ItemId,
        action_type: &str,
        score: f64,
    ) -> Result<BehaviorEvent> {
        let event = BehaviorEvent::new(user_id, item_id, ActionType::parse(action_type), score);
        self.record(event).await
    }

    /// Append an event weighted with the action's default score
    pub async fn record_action(
        &self,
        user_id: UserId,
        item_id: ItemId,
        action: ActionType,
    ) -> Result<BehaviorEvent> {
        let weight = action.default_weight();
        self.record(BehaviorEvent::new(user_id, item_id, action, weight))
            .await
    }

    async fn record(&self, event: BehaviorEvent) -> Result<BehaviorEvent> {
        let user_id = event.user_id;
        let stored = self.behaviors.insert(event).await?;

        let invalidated = self.invalidate_user(user_id);
        self.spawn_preference_recompute(user_id);

        info!(
            user_id,
            item_id = stored.item_id,
            action = %stored.action_type,
            weight = stored.weight,
            invalidated,
            "Behavior recorded"
        );
        Ok(stored)
    }

    pub async fn delete_user_behaviors(&self, user_id: UserId) -> Result<usize> {
        let deleted = self.behaviors.delete_by_user(user_id).await?;
        self.invalidate_user(user_id);
        info!(user_id, deleted, "User behaviors deleted");
        Ok(deleted)
    }

    /// Any user may have interacted with the item, so every per-user entry goes
    pub async fn delete_item_behaviors(&self, item_id: ItemId) -> Result<usize> {
        let deleted = self.behaviors.delete_by_item(item_id).await?;
        let flushed = self.flush_user_entries();
        info!(item_id, deleted, flushed, "Item behaviors deleted");
        Ok(deleted)
    }

    /// Drop the preference vector and every cached result of `user_id`.
    /// The popular snapshot is untouched.
    ///
    /// The vector must go first: a reader that misses the results after the
    /// sweep must not find the old vector and cache a ranking built from it.
    pub fn invalidate_user(&self, user_id: UserId) -> usize {
        let vectors = self.vectors.invalidate_user(user_id);
        let results = self.results.invalidate_user(user_id);
        debug!(user_id, results, vectors, "User cache invalidated");
        results + vectors
    }

    fn flush_user_entries(&self) -> usize {
        self.results.clear() + self.vectors.clear()
    }

    fn spawn_preference_recompute(&self, user_id: UserId) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.preference_vector(user_id).await {
                service.metrics.record_recompute_failure();
                warn!(user_id, error = %e, "Preference vector recomputation failed");
            }
        });
    }

    // ========================================================================
    // Model refresh
    // ========================================================================

    /// Start a rebuild in the background and return immediately
    pub fn update_recommendation_model(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.rebuild_model().await {
                warn!(error = %e, "Recommendation model rebuild failed");
            }
        });
    }

    /// Flush every per-user entry and rebuild the popular snapshot.
    /// Returns the snapshot size.
    pub async fn rebuild_model(&self) -> Result<usize> {
        let started = Instant::now();
        let flushed = self.flush_user_entries();
        let popular_count = self.popular.refresh().await?;

        info!(
            flushed,
            popular_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Recommendation model rebuilt"
        );
        Ok(popular_count)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn cached<Fut>(&self, key: CacheKey, compute: Fut) -> Vec<Item>
    where
        Fut: Future<Output = Resolved>,
    {
        // Err carries a result that must be returned but not stored
        let outcome = self
            .results
            .get_or_try_compute(key, self.results.default_ttl(), || async move {
                let resolved = compute.await;
                if resolved.cacheable {
                    Ok(resolved.items)
                } else {
                    Err(resolved.items)
                }
            })
            .await;

        match outcome {
            Ok(items) | Err(items) => items,
        }
    }

    async fn single(&self, strategy: Strategy, user_id: UserId, limit: usize) -> Vec<Item> {
        let key = CacheKey::new(strategy, user_id, limit);
        self.cached(key, self.compute_single(strategy, user_id, limit))
            .await
    }

    async fn fallback(
        &self,
        strategy: Strategy,
        limit: usize,
        reason: &str,
        cacheable: bool,
    ) -> Resolved {
        self.metrics.record_fallback(strategy.as_str(), reason);
        Resolved {
            items: self.popular.top(limit).await,
            cacheable,
        }
    }

    async fn compute_single(&self, kind: Strategy, user_id: UserId, limit: usize) -> Resolved {
        let Some(strategy) = self.strategies.iter().find(|s| s.kind() == kind) else {
            warn!(strategy = %kind, "No scorer registered for strategy");
            return self.fallback(kind, limit, "unsupported", false).await;
        };

        let vector = match self.preference_vector(user_id).await {
            Ok(vector) => vector,
            Err(e) => return self.store_fallback(kind, user_id, limit, e).await,
        };

        match strategy.recommend(user_id, &vector, limit).await {
            Ok(Outcome::Ranked(items)) if !items.is_empty() => {
                debug!(user_id, strategy = %kind, count = items.len(), "Strategy ranked roles");
                Resolved {
                    items,
                    cacheable: true,
                }
            }
            Ok(Outcome::Ranked(_)) => self.fallback(kind, limit, "no_candidates", true).await,
            Ok(Outcome::ColdStart) => self.fallback(kind, limit, "cold_start", true).await,
            Err(e) => self.store_fallback(kind, user_id, limit, e).await,
        }
    }

    async fn store_fallback(
        &self,
        kind: Strategy,
        user_id: UserId,
        limit: usize,
        error: StoreError,
    ) -> Resolved {
        let error = AppError::from(error);
        warn!(
            user_id,
            strategy = %kind,
            error = %error,
            "Strategy failed, serving popular roles"
        );
        self.fallback(kind, limit, error.reason(), false).await
    }

    async fn compute_hybrid(&self, user_id: UserId, limit: usize) -> Resolved {
        let deadline = tokio::time::Instant::now() + self.config.hybrid_timeout;

        let handles: Vec<_> = FUSED_STRATEGIES
            .iter()
            .map(|&strategy| {
                let service = self.clone();
                let handle =
                    tokio::spawn(async move { service.single(strategy, user_id, limit).await });
                (strategy, handle)
            })
            .collect();

        let mut lists = Vec::with_capacity(handles.len());
        let mut degraded = false;
        for (strategy, handle) in handles {
            let items = match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(items)) => items,
                Ok(Err(e)) => {
                    warn!(
                        user_id,
                        strategy = %strategy,
                        error = %e,
                        "Hybrid sub-strategy task failed"
                    );
                    self.metrics.record_hybrid_timeout(strategy.as_str());
                    degraded = true;
                    Vec::new()
                }
                Err(_) => {
                    warn!(
                        user_id,
                        strategy = %strategy,
                        timeout_ms = self.config.hybrid_timeout.as_millis() as u64,
                        "Hybrid sub-strategy timed out"
                    );
                    self.metrics.record_hybrid_timeout(strategy.as_str());
                    degraded = true;
                    Vec::new()
                }
            };
            lists.push((strategy, items));
        }

        if lists.iter().all(|(_, items)| items.is_empty()) {
            return self
                .fallback(Strategy::Hybrid, limit, "all_empty", !degraded)
                .await;
        }

        Resolved {
            items: fuse(&lists, &self.weights, limit),
            cacheable: !degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn role(id: ItemId, category: &str, popularity: i64) -> Item {
        Item {
            id,
            name: format!("role-{}", id),
            category: Some(category.to_string()),
            description: None,
            popularity,
        }
    }

    fn service_with(store: Arc<InMemoryStore>) -> RecommendationService {
        RecommendationService::new(
            store.clone(),
            store.clone(),
            store,
            RecommendationConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_limit() {
        let service = service_with(Arc::new(InMemoryStore::new()));
        assert_eq!(service.normalize_limit(0), 10);
        assert_eq!(service.normalize_limit(-5), 10);
        assert_eq!(service.normalize_limit(3), 3);
        assert_eq!(service.normalize_limit(1_000), 100);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let store = Arc::new(InMemoryStore::new());
        let config = RecommendationConfig {
            personalized_weight: 0.9,
            ..RecommendationConfig::default()
        };
        let result = RecommendationService::new(store.clone(), store.clone(), store, config);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_record_invalidates_only_that_user() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_item(role(1, "sci-fi", 5));
        store.upsert_item(role(2, "romance", 5));
        let service = service_with(store);

        service.get_personalized_recommendations(1, 5).await;
        service.get_personalized_recommendations(2, 5).await;
        service.get_content_based_recommendations(2, 5).await;

        service
            .record_user_behavior(1, 1, "chat", 5.0)
            .await
            .unwrap();

        assert!(service
            .results
            .get(&CacheKey::new(Strategy::Personalized, 1, 5))
            .is_none());
        assert!(service
            .results
            .get(&CacheKey::new(Strategy::Personalized, 2, 5))
            .is_some());
        assert!(service
            .results
            .get(&CacheKey::new(Strategy::ContentBased, 2, 5))
            .is_some());
    }

    #[tokio::test]
    async fn test_invalidate_user_drops_vector_and_results() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_item(role(1, "sci-fi", 5));
        let service = service_with(store.clone());

        service.get_personalized_recommendations(1, 5).await;
        assert_eq!(service.vectors.get(&1).map(|v| v.total_chats), Some(0));

        store
            .insert(BehaviorEvent::new(1, 1, ActionType::Chat, 5.0))
            .await
            .unwrap();
        assert_eq!(service.invalidate_user(1), 2);
        assert!(service.vectors.get(&1).is_none());
        assert!(service.results.is_empty());

        let vector = service.preference_vector(1).await.unwrap();
        assert_eq!(vector.total_chats, 1);
    }

    #[tokio::test]
    async fn test_rebuild_model_flushes_results() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_item(role(1, "sci-fi", 5));
        let service = service_with(store);

        service.get_hybrid_recommendations(7, 10).await;
        assert!(!service.results.is_empty());

        let popular = service.rebuild_model().await.unwrap();
        assert_eq!(popular, 1);
        assert!(service.results.is_empty());
    }

    #[tokio::test]
    async fn test_explanation_for_new_user() {
        let service = service_with(Arc::new(InMemoryStore::new()));
        let text = service.get_recommendation_explanation(3, &[1, 2]).await;
        assert_eq!(text, crate::services::explain::POPULAR_EXPLANATION);
    }
}
