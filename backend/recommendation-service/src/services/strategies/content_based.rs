use async_trait::async_trait;
use std::sync::Arc;

use super::{Outcome, RecommendationStrategy};
use crate::models::{Item, PreferenceVector, ScoredItem, Strategy, UserId};
use crate::store::{ItemCatalog, StoreResult};

const CATEGORY_COUNT_WEIGHT: f64 = 0.5;
const DESCRIPTION_MATCH_BONUS: f64 = 0.3;

/// Category affinity of `item` plus a bonus when its description mentions
/// the preferred category.
pub fn content_score(item: &Item, vector: &PreferenceVector) -> f64 {
    let mut score = item
        .category
        .as_deref()
        .map(|category| vector.category_count(category) as f64 * CATEGORY_COUNT_WEIGHT)
        .unwrap_or(0.0);

    if let (Some(description), Some(preferred)) = (&item.description, &vector.preferred_category) {
        if description.contains(preferred.as_str()) {
            score += DESCRIPTION_MATCH_BONUS;
        }
    }

    score
}

pub struct ContentBasedStrategy {
    catalog: Arc<dyn ItemCatalog>,
}

impl ContentBasedStrategy {
    pub fn new(catalog: Arc<dyn ItemCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl RecommendationStrategy for ContentBasedStrategy {
    fn kind(&self) -> Strategy {
        Strategy::ContentBased
    }

    async fn recommend(
        &self,
        _user_id: UserId,
        vector: &PreferenceVector,
        limit: usize,
    ) -> StoreResult<Outcome> {
        if vector.is_empty() {
            return Ok(Outcome::ColdStart);
        }

        let scored = self
            .catalog
            .list_all_items()
            .await?
            .into_iter()
            .map(|item| {
                let score = content_score(&item, vector);
                ScoredItem { item, score }
            })
            .collect();

        Ok(Outcome::Ranked(ScoredItem::rank(scored, limit)))
    }
}
