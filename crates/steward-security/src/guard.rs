use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use steward_core::{StewardError, StewardResult};
use tracing::warn;

/// Strip control characters from a query before it reaches logs or handlers.
/// Newlines and tabs are preserved.
pub fn sanitize_query(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
        .collect()
}

/// Run `fut` with a bounded deadline.
///
/// On elapse the stage is treated as a transient failure, so the caller's
/// retry budget applies before the run terminally fails.
pub async fn with_timeout<T>(
    duration: Duration,
    fut: impl Future<Output = StewardResult<T>>,
) -> StewardResult<T> {
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(StewardError::agent_retryable(format!(
            "timed out after {}ms",
            duration.as_millis()
        ))),
    }
}

/// Configures automatic retry behaviour for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first, for retryable errors only.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub backoff_base_ms: u64,
    /// Cap on the backoff delay in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_base_ms: 250,
            backoff_max_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff for the given attempt, capped at `backoff_max_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let delay = self
            .backoff_base_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay.min(self.backoff_max_ms))
    }
}

/// Run `op`, retrying retryable failures up to `policy.max_retries` extra
/// times with exponential backoff. Non-retryable errors return immediately.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> StewardResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StewardResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
