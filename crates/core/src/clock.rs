//! Time source for every sleep and rate-limit decision.
//!
//! Retry backoff, the rate limiter and the fixed inter-tile/inter-point
//! delays all go through a [`Clock`], so tests swap in
//! `testing::ManualClock` and run without waiting.

use std::time::{Duration, Instant};

use async_trait::async_trait;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_clock_sleeps() {
        let clock = TokioClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(20)).await;
        assert!(clock.now().duration_since(start) >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_zero_sleep_returns_immediately() {
        let clock = TokioClock;
        let start = clock.now();
        clock.sleep(Duration::ZERO).await;
        assert!(clock.now().duration_since(start) < Duration::from_millis(50));
    }
}
