//! Rate limiter trait for abstracting over store implementations.

use async_trait::async_trait;

use super::limiter::RateLimiter;
use crate::error::Result;
use crate::store::ScriptStore;

/// Trait for rate limiter implementations.
///
/// This lets callers hold an `Arc<dyn RateLimiterBackend>` without naming the
/// store the limiter counts in.
#[async_trait]
pub trait RateLimiterBackend: Send + Sync {
    /// Count a hit for `tracker` and decide whether it is allowed.
    async fn allow(&self, tracker: &str) -> Result<bool>;
}

#[async_trait]
impl<S: ScriptStore> RateLimiterBackend for RateLimiter<S> {
    async fn allow(&self, tracker: &str) -> Result<bool> {
        RateLimiter::allow(self, tracker).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_limiter_behind_trait_object() {
        let limiter: Arc<dyn RateLimiterBackend> =
            Arc::new(RateLimiter::new(MemoryStore::new(), 1, 10).unwrap());

        assert!(limiter.allow("tracker").await.unwrap());
        assert!(!limiter.allow("tracker").await.unwrap());
    }
}
