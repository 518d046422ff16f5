//! Bounded retry with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Retry settings shared by panorama id lookup and tile download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Pause between two attempts in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    5000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// Attempt count plus the fixed delay slept between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// A zero attempt count is treated as one.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Delay to sleep after the given 1-based attempt failed, or `None` when
    /// it was the last one.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt < self.attempts {
            Some(self.delay)
        } else {
            None
        }
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number. `on_failure` is called after
    /// every failed attempt (before the backoff sleep) and is the hook for
    /// logging and metrics. The last error is returned on exhaustion.
    pub async fn run<T, E, Op, Fut, OnFailure>(
        &self,
        clock: &dyn Clock,
        mut on_failure: OnFailure,
        mut op: Op,
    ) -> Result<T, E>
    where
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        OnFailure: FnMut(u32, &E),
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    on_failure(attempt, &err);
                    match self.delay_after(attempt) {
                        Some(delay) => {
                            clock.sleep(delay).await;
                            attempt += 1;
                        }
                        None => return Err(err),
                    }
                }
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_millis(config.delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;
    use std::cell::Cell;

    #[test]
    fn test_delay_after() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        assert_eq!(policy.delay_after(1), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_after(3), None);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.attempts(), 1);
    }

    #[tokio::test]
    async fn test_always_failing_is_attempted_exactly_n_times() {
        let clock = ManualClock::new();
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let calls = Cell::new(0);
        let failures = Cell::new(0);

        let result: Result<(), &str> = policy
            .run(
                &clock,
                |_, _| failures.set(failures.get() + 1),
                |_| {
                    calls.set(calls.get() + 1);
                    async { Err("nope") }
                },
            )
            .await;

        assert_eq!(result, Err("nope"));
        assert_eq!(calls.get(), 3);
        assert_eq!(failures.get(), 3);
        // Sleeps only between attempts, never after the last one
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
    }

    #[tokio::test]
    async fn test_stops_on_first_success() {
        let clock = ManualClock::new();
        let policy = RetryPolicy::new(5, Duration::from_millis(100));

        let result: Result<u32, String> = policy
            .run(&clock, |_, _| {}, |attempt| async move {
                if attempt == 2 {
                    Ok(attempt)
                } else {
                    Err(format!("attempt {} failed", attempt))
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(100)]);
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            attempts: 4,
            delay_ms: 250,
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.attempts(), 4);
        assert_eq!(policy.delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_config_defaults() {
        let config: RetryConfig = toml::from_str("").unwrap();
        assert_eq!(config.attempts, 3);
        assert_eq!(config.delay_ms, 5000);
    }
}
