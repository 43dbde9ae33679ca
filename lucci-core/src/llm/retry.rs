//! Retry logic for LLM providers
//!
//! Exponential backoff with jitter for transient failures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: usize,
    /// Initial delay before first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Maximum delay between retries
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add up to 25% jitter to each delay
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculate delay for a given retry (0-indexed)
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);

        let clamped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.add_jitter {
            clamped_delay + clamped_delay * 0.25 * rand_jitter()
        } else {
            clamped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Pseudo-random jitter in [0.0, 1.0) from a simple LCG
fn rand_jitter() -> f64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SEED: AtomicU64 = AtomicU64::new(0);

    const A: u64 = 1103515245;
    const C: u64 = 12345;
    const M: u64 = 1 << 31;

    let seed = SEED.fetch_add(1, Ordering::Relaxed);
    let time_component = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let combined = seed.wrapping_add(time_component);
    let next = (A.wrapping_mul(combined).wrapping_add(C)) % M;

    (next as f64) / (M as f64)
}

/// Execute an async operation, retrying errors the predicate accepts.
///
/// Errors the predicate rejects are returned immediately.
pub async fn with_retry<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;

                if attempt >= max_attempts || !is_retryable(&e) {
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt - 1);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert!(config.add_jitter);
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::default().with_jitter(false);

        assert_eq!(config.delay_for_attempt(0).as_millis(), 500);
        assert_eq!(config.delay_for_attempt(1).as_millis(), 1000);
        assert_eq!(config.delay_for_attempt(2).as_millis(), 2000);
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::default()
            .with_jitter(false)
            .with_max_delay(Duration::from_secs(1));

        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(1));
    }

    #[test]
    fn test_humantime_fields() {
        let config: RetryConfig =
            serde_json::from_value(serde_json::json!({"initial_delay": "250ms", "max_delay": "2s"}))
                .unwrap();
        assert_eq!(config.initial_delay, Duration::from_millis(250));
        assert_eq!(config.max_delay, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 3);
    }

    #[tokio::test]
    async fn test_with_retry_eventual_success() {
        let attempts = AtomicUsize::new(0);
        let config = RetryConfig::default()
            .with_max_attempts(3)
            .with_initial_delay(Duration::from_millis(10));

        let result = with_retry(
            &config,
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err("transient error")
                    } else {
                        Ok("success")
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_exhausted() {
        let attempts = AtomicUsize::new(0);
        let config = RetryConfig::default()
            .with_max_attempts(2)
            .with_initial_delay(Duration::from_millis(10));

        let result: Result<(), &str> = with_retry(
            &config,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("persistent error") }
            },
            |_| true,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let attempts = AtomicUsize::new(0);
        let config = RetryConfig::default().with_initial_delay(Duration::from_millis(10));

        let result: Result<(), &str> = with_retry(
            &config,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("bad request") }
            },
            |_| false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
