//! Rolling-window rate limiter for coordinate conversion calls.
//!
//! At most `calls` acquisitions are granted inside any window of length
//! `period`. Callers that find the window full wait until the oldest grant
//! ages out; they are never rejected. One limiter is shared by the whole
//! process (wrap it in an `Arc`).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::metrics;

/// Snapshot of the limiter state.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitStatus {
    pub calls_per_period: u32,
    pub period: Duration,
    pub calls_in_window: usize,
    pub next_available_in: Option<Duration>,
}

/// Grants recorded inside the current window.
#[derive(Debug)]
struct Window {
    capacity: u32,
    period: Duration,
    grants: VecDeque<Instant>,
}

impl Window {
    fn new(capacity: u32, period: Duration) -> Self {
        Self {
            capacity,
            period,
            grants: VecDeque::with_capacity(capacity as usize),
        }
    }

    /// Drop grants that no longer fall inside the window ending at `now`.
    fn expire(&mut self, now: Instant) {
        while let Some(oldest) = self.grants.front() {
            if now.saturating_duration_since(*oldest) >= self.period {
                self.grants.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record a grant at `now`, or return how long until one is possible.
    fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        self.expire(now);

        if self.grants.len() < self.capacity as usize {
            self.grants.push_back(now);
            return Ok(());
        }

        // Full window: wait until the oldest grant expires
        let oldest = self.grants.front().copied().unwrap_or(now);
        let age = now.saturating_duration_since(oldest);
        Err(self.period.saturating_sub(age))
    }
}

/// Blocking rate limiter: `calls` per rolling `period`.
pub struct RateLimiter {
    window: Mutex<Window>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter. A zero `calls` value is treated as one.
    pub fn new(calls: u32, period: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: Mutex::new(Window::new(calls.max(1), period)),
            clock,
        }
    }

    /// Wait until a call may be issued, then record it.
    ///
    /// The internal lock is held while waiting, so concurrent callers are
    /// served one at a time in arrival order. Returns the total time spent
    /// waiting.
    pub async fn acquire(&self) -> Duration {
        let mut window = self.window.lock().await;
        let mut waited = Duration::ZERO;

        loop {
            match window.try_acquire(self.clock.now()) {
                Ok(()) => {
                    if !waited.is_zero() {
                        metrics::RATE_LIMIT_WAITS.inc();
                    }
                    return waited;
                }
                Err(wait) => {
                    self.clock.sleep(wait).await;
                    waited += wait;
                }
            }
        }
    }

    /// Record a call only if the window has room.
    ///
    /// Returns `Err(wait)` with the time until capacity frees up otherwise.
    pub async fn try_acquire(&self) -> Result<(), Duration> {
        let mut window = self.window.lock().await;
        window.try_acquire(self.clock.now())
    }

    /// Current limiter status.
    pub async fn status(&self) -> RateLimitStatus {
        let mut window = self.window.lock().await;
        let now = self.clock.now();
        window.expire(now);

        let next_available_in = if window.grants.len() < window.capacity as usize {
            None
        } else {
            window
                .grants
                .front()
                .map(|oldest| window.period.saturating_sub(now.saturating_duration_since(*oldest)))
        };

        RateLimitStatus {
            calls_per_period: window.capacity,
            period: window.period,
            calls_in_window: window.grants.len(),
            next_available_in,
        }
    }
}
