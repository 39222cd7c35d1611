//! Retry with exponential backoff for adapter calls.
//!
//! Retries are an adapter-layer concern: scorers and the orchestrator call
//! [`run`] around individual store operations and never implement their own
//! retry loops. Only errors whose kind is retryable are attempted again;
//! rate-limit responses back off longer than ordinary transient faults.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::StoreError;
use crate::error::StoreErrorKind;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// Base for exponential backoff.
    pub base_delay: Duration,
    /// Ceiling for a single delay.
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Extra multiplier applied after a rate-limit response.
    pub rate_limit_multiplier: f64,
    /// Add pseudo-random jitter to avoid synchronized retries.
    pub jitter: bool,
    /// Cap on total time spent, including sleeps. `None` = unbounded.
    pub total_budget: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            rate_limit_multiplier: 4.0,
            jitter: true,
            total_budget: None,
        }
    }
}

impl RetryConfig {
    /// Policy for embedding-service calls: 30 s total including retries.
    pub fn embedding() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            total_budget: Some(Duration::from_secs(30)),
            ..Self::default()
        }
    }

    /// Policy for batch workers: base 1 s, cap 30 s.
    pub fn worker() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_total_budget(mut self, budget: Option<Duration>) -> Self {
        self.total_budget = budget;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before the given retry attempt (1-indexed; attempt 0 never
    /// sleeps). Rate-limited errors stretch the delay further.
    pub fn calculate_delay(&self, attempt: u32, kind: StoreErrorKind) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let mut delay_ms =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32 - 1);
        if kind == StoreErrorKind::RateLimited {
            delay_ms *= self.rate_limit_multiplier;
        }
        let mut delay_ms = delay_ms.min(self.max_delay.as_millis() as f64) as u64;

        if self.jitter {
            let jitter_range = delay_ms / 4;
            if jitter_range > 0 {
                let nanos = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos() as u64;
                delay_ms = delay_ms.saturating_sub(jitter_range) + nanos % (jitter_range * 2);
            }
        }
        Duration::from_millis(delay_ms)
    }
}

/// Execute an adapter operation, retrying retryable failures.
///
/// The operation receives the attempt index (0 = first try). Fatal, not-found,
/// and conflict errors return immediately; the total budget is enforced before
/// each sleep so the call never oversleeps its deadline.
pub async fn run<T, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, StoreError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let start = std::time::Instant::now();
    let mut last_error: Option<StoreError> = None;

    for attempt in 0..=config.max_retries {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }
                let kind = err.kind;
                last_error = Some(err);
                if attempt < config.max_retries {
                    let delay = config.calculate_delay(attempt + 1, kind);
                    if let Some(budget) = config.total_budget {
                        if start.elapsed() + delay >= budget {
                            break;
                        }
                    }
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| StoreError::transient("retries exhausted without an attempt")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_first_try() {
        let config = RetryConfig::default().with_jitter(false);
        let result = run(&config, |_| async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let config = RetryConfig::default()
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false);
        let calls = AtomicU32::new(0);
        let result = run(&config, |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(StoreError::transient("blip"))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_never_retry() {
        let config = RetryConfig::default().with_jitter(false);
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run(&config, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::fatal("broken")) }
        })
        .await;
        assert_eq!(result.unwrap_err().kind, StoreErrorKind::Fatal);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let config = RetryConfig::default()
            .with_max_retries(2)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false);
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run(&config, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::transient("persistent")) }
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Transient);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn rate_limited_backs_off_longer() {
        let config = RetryConfig::default().with_jitter(false);
        let transient = config.calculate_delay(1, StoreErrorKind::Transient);
        let limited = config.calculate_delay(1, StoreErrorKind::RateLimited);
        assert!(limited > transient);
    }

    #[test]
    fn delay_respects_cap() {
        let config = RetryConfig {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_millis(500),
            jitter: false,
            ..Default::default()
        };
        assert!(config.calculate_delay(3, StoreErrorKind::Transient) <= Duration::from_millis(500));
    }
}
