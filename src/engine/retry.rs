// Backoff for transient engine failures. One attempt (no retry) is the
// default so an unmodified supervisor fails fast on the first error.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{error, warn};

use crate::engine::{CycleIdentifier, EngineError, TaskListIdentifier, WorkflowEngine};
use crate::observability::supervisor_metrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retrying
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(120),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn fail_fast() -> Self {
        Self::default()
    }

    /// Waits before each retry: `base * 2^n` for retry `n`, capped at
    /// `max_delay`, scaled by a random factor in `[0, 1)` with jitter.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        let with_jitter = self.jitter;
        ExponentialBackoff::from_millis(2)
            .factor(self.base_delay.as_millis() as u64)
            .max_delay(self.max_delay)
            .map(move |delay| if with_jitter { jitter(delay) } else { delay })
            .take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Run `operation` until it succeeds, fails fatally, or the attempt
    /// budget is spent. The last error is returned unchanged.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempts = 0u32;

        let result = RetryIf::spawn(self.strategy(), operation, |e: &EngineError| {
            attempts += 1;
            let retry = e.is_transient() && attempts < max_attempts;
            if retry {
                supervisor_metrics().record_retry();
                warn!(
                    operation = %operation_name,
                    attempt = attempts,
                    max_attempts,
                    error = %e,
                    "Transient engine failure, retrying"
                );
            }
            retry
        })
        .await;

        if let Err(e) = &result {
            if attempts > 1 {
                error!(operation = %operation_name, attempts, error = %e, "Giving up");
            }
        }
        result
    }
}

/// Applies a `RetryPolicy` to every call of the wrapped engine.
pub struct RetryingEngine<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: WorkflowEngine> RetryingEngine<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: WorkflowEngine> WorkflowEngine for RetryingEngine<E> {
    async fn synchronize(&self) -> Result<(), EngineError> {
        self.policy
            .run("synchronize", || self.inner.synchronize())
            .await
    }

    async fn boot(
        &self,
        cycle: &CycleIdentifier,
        task_list: &TaskListIdentifier,
    ) -> Result<(), EngineError> {
        self.policy
            .run("boot", || self.inner.boot(cycle, task_list))
            .await
    }
}
