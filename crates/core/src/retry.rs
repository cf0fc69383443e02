use std::future::Future;
use std::time::{Duration, SystemTime};
use tracing::warn;

/// Upper bound on any single backoff sleep.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Exponential backoff schedule shared by the embedding and generation
/// clients. `max_attempts` counts invocations, not retries, so a policy of
/// three attempts sleeps at most twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: bool,
}

impl RetryPolicy {
    /// Schedule used when embedding chunk or query text.
    pub fn embedding() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_millis(500),
            jitter: true,
        }
    }

    /// Schedule used when calling the generation model.
    pub fn generation() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            jitter: false,
        }
    }

    /// Delay slept after the given zero-based failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let doubled = self.base_delay.saturating_mul(1 << attempt.min(10));
        let capped = doubled.min(MAX_DELAY);
        if self.jitter {
            capped + capped.mul_f64(0.25 * subsec_noise())
        } else {
            capped
        }
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are spent,
/// sleeping the backoff schedule between failures. The last error is
/// returned unchanged when every attempt fails.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(error);
                }
                let delay = policy.delay_after(attempt - 1);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

// Cheap jitter source in [0, 1) derived from the clock's sub-second nanos.
fn subsec_noise() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
