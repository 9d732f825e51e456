//! Cache key schema for per-user recommendation results
//!
//! Rendered format: v{VERSION}:rec:{strategy}:{user_id}:{limit}

use std::fmt;

use crate::models::{Strategy, UserId};

/// Cache schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub strategy: Strategy,
    pub user_id: UserId,
    pub limit: usize,
}

impl CacheKey {
    pub fn new(strategy: Strategy, user_id: UserId, limit: usize) -> Self {
        Self {
            strategy,
            user_id,
            limit,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{}:rec:{}:{}:{}",
            CACHE_VERSION, self.strategy, self.user_id, self.limit
        )
    }
}
