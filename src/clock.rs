//! Time source for retry backoff and processing polls.

use async_trait::async_trait;
use std::time::Duration;

/// Suspends the caller for a fixed delay
#[async_trait]
pub trait Clock: Send + Sync {
    async fn after(&self, delay: Duration);
}

/// Wall-clock implementation backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn after(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
