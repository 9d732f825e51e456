// ============================================
// Background Jobs
// ============================================
//
// Long-running loops spawned by the worker binary:
// 1. Model refresh (popular snapshot rebuild + per-user cache flush)
// 2. Cache warming for recently active users

pub mod cache_warmer;
pub mod model_refresher;

pub use cache_warmer::start_cache_warmer;
pub use model_refresher::{start_model_refresher, ModelRefresherConfig};
