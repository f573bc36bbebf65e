//! Bounded retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::SourceError;

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// `base * factor^retry`, capped at `max`, optionally jittered by +/- 50%.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(8),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `retry` (0-based).
    pub fn delay(self, retry: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let seconds = (base.as_secs_f64() * factor.powi(exponent)).min(max.as_secs_f64());
                let millis = (seconds * 1_000.0) as u64;
                if !jitter || millis == 0 {
                    return Duration::from_millis(millis);
                }

                let spread = millis / 2;
                let jittered = millis - spread + fastrand::u64(0..=spread * 2);
                Duration::from_millis(jittered)
            }
        }
    }
}

/// Which failures are retried and how long to wait between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub backoff: Backoff,
    /// HTTP statuses treated as transient.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff::default(),
            retry_on_status: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping. Used by offline sources and tests.
    pub fn immediate() -> Self {
        Self {
            backoff: Backoff::Fixed {
                delay: Duration::ZERO,
            },
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or `max_attempts` calls have been made.
    ///
    /// `operation` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        max_attempts: u32,
        label: &str,
        mut operation: F,
    ) -> Result<T, SourceError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.retryable() {
                return Err(error);
            }
            if attempt >= max_attempts {
                return Err(error.exhausted(attempt));
            }

            let delay = self.delay_for_retry(attempt - 1);
            debug!(
                label,
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "retrying upstream call"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(7), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_half_either_side() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        for _ in 0..20 {
            for retry in 0..5 {
                let expected = (100.0 * 2_f64.powi(retry as i32)).min(1_000.0);
                let delay_ms = backoff.delay(retry).as_millis() as f64;
                assert!(delay_ms >= expected * 0.5, "retry={retry} delay_ms={delay_ms}");
                assert!(delay_ms <= expected * 1.5, "retry={retry} delay_ms={delay_ms}");
            }
        }
    }

    #[test]
    fn default_policy_retries_transient_statuses() {
        let policy = RetryPolicy::default();
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(policy.should_retry_status(status));
        }
        assert!(!policy.should_retry_status(400));
        assert!(!policy.should_retry_status(404));
    }

    #[tokio::test]
    async fn run_stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), SourceError> = RetryPolicy::immediate()
            .run(5, "test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::unavailable("down")) }
            })
            .await;

        let error = result.expect_err("must exhaust");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(!error.retryable());
    }

    #[tokio::test]
    async fn run_returns_first_success() {
        let result = RetryPolicy::immediate()
            .run(5, "test", |attempt| async move {
                if attempt < 3 {
                    Err(SourceError::unavailable("flaky"))
                } else {
                    Ok(attempt)
                }
            })
            .await;
        assert_eq!(result.expect("third attempt"), 3);
    }

    #[tokio::test]
    async fn run_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), SourceError> = RetryPolicy::immediate()
            .run(5, "test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::invalid_request("bad code")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
