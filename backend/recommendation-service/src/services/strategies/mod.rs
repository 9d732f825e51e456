mod collaborative;
mod content_based;
mod personalized;

use async_trait::async_trait;

use crate::models::{Item, PreferenceVector, Strategy, UserId};
use crate::store::StoreResult;

pub use collaborative::{find_similar_users, jaccard_similarity, CollaborativeStrategy, SimilarUser};
pub use content_based::{content_score, ContentBasedStrategy};
pub use personalized::{personalized_score, PersonalizedStrategy};

/// Result of running one strategy
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ranked(Vec<Item>),
    /// Not enough signal to personalize; the caller serves popular roles
    ColdStart,
}

/// One ranking strategy behind the facade
#[async_trait]
pub trait RecommendationStrategy: Send + Sync {
    fn kind(&self) -> Strategy;

    /// Rank up to `limit` roles for `user_id`.
    ///
    /// Store failures are returned as errors; the facade turns them into a
    /// popular-roles fallback.
    async fn recommend(
        &self,
        user_id: UserId,
        vector: &PreferenceVector,
        limit: usize,
    ) -> StoreResult<Outcome>;
}
