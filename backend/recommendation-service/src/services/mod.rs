//! Recommendation core: preference aggregation, scoring strategies, rank
//! fusion and the facade that ties them to the caches.

pub mod analytics;
pub mod explain;
pub mod hybrid;
pub mod preference;
pub mod recommendation;
pub mod strategies;

pub use analytics::BehaviorAnalytics;
pub use hybrid::{fuse, HybridWeights};
pub use preference::PreferenceVectorBuilder;
pub use recommendation::RecommendationService;
pub use strategies::{jaccard_similarity, Outcome, RecommendationStrategy};
