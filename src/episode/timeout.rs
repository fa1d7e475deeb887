use std::future::Future;
use std::time::Duration;

use crate::config::EpisodeConfig;
use crate::errors::{ArenaError, ArenaResult};
use crate::grounding::retry::{Attempt, RetryPolicy};

/// Per-attempt deadline for environment calls, retried a bounded number of
/// times. Only timeouts are retried; other errors surface immediately.
#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    pub timeout: Duration,
    retry: RetryPolicy,
}

impl TimeoutPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            retry: RetryPolicy::immediate(max_retries),
        }
    }

    pub fn from_config(config: &EpisodeConfig) -> Self {
        Self::new(Duration::from_secs(config.env_timeout_secs), config.env_max_retries)
    }

    /// Run `op`, starting a fresh call for every attempt.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> ArenaResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ArenaResult<T>>,
    {
        let timeout = self.timeout;
        let max = self.retry.max_attempts;
        let out = self
            .retry
            .run(operation, move |attempt| {
                let call = op();
                async move {
                    match tokio::time::timeout(timeout, call).await {
                        Ok(result) => result.map(Attempt::Ready),
                        Err(_) => {
                            tracing::warn!(
                                operation,
                                attempt,
                                max,
                                "environment call timed out, retrying"
                            );
                            Ok(Attempt::Retry(format!("timed out after {timeout:?}")))
                        }
                    }
                }
            })
            .await?;

        out.ok_or_else(|| ArenaError::EnvironmentTimeout {
            operation: operation.to_string(),
            attempts: max,
        })
    }
}
