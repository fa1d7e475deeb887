use std::future::Future;
use std::time::Duration;

use crate::errors::ArenaResult;

/// Outcome of a single attempt under a [`RetryPolicy`].
#[derive(Debug)]
pub enum Attempt<T> {
    Ready(T),
    /// Try again; the reason is only logged.
    Retry(String),
}

/// Bounded retry with optional exponential backoff between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Retries back to back, no delay.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay after the given 1-based failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let nanos = self.base_delay.as_nanos() as f64 * factor;
        Duration::from_nanos(nanos.min(u64::MAX as f64) as u64).min(self.max_delay)
    }

    /// Run `op` until it is ready or attempts run out.
    ///
    /// `Ok(None)` means every attempt asked for a retry. An `Err` from `op`
    /// stops the loop immediately.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> ArenaResult<Option<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ArenaResult<Attempt<T>>>,
    {
        for attempt in 1..=self.max_attempts {
            match op(attempt).await? {
                Attempt::Ready(value) => {
                    if attempt > 1 {
                        tracing::debug!(label, attempt, "succeeded after retry");
                    }
                    return Ok(Some(value));
                }
                Attempt::Retry(reason) => {
                    tracing::debug!(
                        label,
                        attempt,
                        max = self.max_attempts,
                        reason = %reason,
                        "attempt did not succeed"
                    );
                    if attempt < self.max_attempts {
                        let delay = self.delay_after(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }
        tracing::warn!(label, attempts = self.max_attempts, "retry budget exhausted");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ArenaError;

    #[tokio::test]
    async fn test_stops_at_first_ready() {
        let policy = RetryPolicy::immediate(10);
        let mut seen = Vec::new();
        let out = policy
            .run("t", |n| {
                seen.push(n);
                async move {
                    Ok(if n == 3 {
                        Attempt::Ready(n)
                    } else {
                        Attempt::Retry("nope".into())
                    })
                }
            })
            .await
            .unwrap();
        assert_eq!(out, Some(3));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_none() {
        let policy = RetryPolicy::immediate(4);
        let mut calls = 0;
        let out: Option<()> = policy
            .run("t", |_| {
                calls += 1;
                async { Ok(Attempt::Retry("never".into())) }
            })
            .await
            .unwrap();
        assert!(out.is_none());
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn test_error_short_circuits() {
        let policy = RetryPolicy::immediate(5);
        let mut calls = 0;
        let out: ArenaResult<Option<()>> = policy
            .run("t", |_| {
                calls += 1;
                async { Err(ArenaError::LlmProvider("down".into())) }
            })
            .await;
        assert!(out.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(300),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(5), Duration::from_millis(300));
        assert_eq!(RetryPolicy::immediate(3).delay_after(2), Duration::ZERO);
    }
}
