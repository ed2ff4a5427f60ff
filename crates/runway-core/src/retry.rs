//! Retry policies for transient failures.
//!
//! `max_attempts` counts every attempt including the first one, so a policy
//! of 3 attempts with a fixed 2 second delay sleeps at most twice.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts (minimum 1).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    #[serde(with = "duration_secs")]
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    #[serde(with = "duration_secs")]
    pub max_delay: Duration,
    /// Growth factor between delays. `1.0` gives a fixed delay.
    pub exponential_base: f64,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        exponential_base: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay,
            exponential_base,
        }
    }

    /// Fixed delay between a bounded number of attempts.
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, delay, delay, 1.0)
    }

    /// A single attempt, no retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            exponential_base: 1.0,
        }
    }

    /// Policy for artifact downloads: 3 attempts, 2 seconds apart.
    #[must_use]
    pub fn download() -> Self {
        Self::fixed(3, Duration::from_secs(2))
    }

    /// Delay to wait before attempt `attempt` (0-indexed).
    ///
    /// Attempt 0 never waits.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay_ms =
            self.initial_delay.as_millis() as f64 * self.exponential_base.powi(exponent);
        let capped_delay_ms = base_delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_delay_ms.max(0.0) as u64)
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    #[must_use]
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Sum of every delay the policy can incur.
    #[must_use]
    pub fn total_delay(&self) -> Duration {
        (1..self.max_attempts)
            .map(|a| self.delay_for_attempt(a))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::download()
    }
}

/// Result of a retry operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// Operation succeeded.
    Success {
        /// The produced value.
        value: T,
        /// Attempts used, including the successful one.
        attempts: u32,
    },
    /// Operation failed on every allowed attempt.
    Exhausted {
        /// The final error.
        error: E,
        /// Total number of attempts made.
        attempts: u32,
    },
    /// A non-retryable error stopped the loop early.
    Aborted {
        /// The error that stopped the loop.
        error: E,
        /// Attempts made before aborting.
        attempts: u32,
    },
}

impl<T, E> RetryOutcome<T, E> {
    /// Returns true if the operation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Number of attempts made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
        }
    }

    /// Converts to a Result, discarding the attempt count.
    #[allow(clippy::missing_errors_doc)]
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Exhausted { error, .. } | Self::Aborted { error, .. } => Err(error),
        }
    }
}

/// Execute an async operation under a retry policy.
///
/// The operation receives the 0-indexed attempt number. `should_retry`
/// decides whether an error is transient; returning `false` aborts.
///
/// # Example
///
/// ```rust,no_run
/// use runway_core::retry::{RetryConfig, retry};
///
/// # async fn example() {
/// let config = RetryConfig::download();
/// let outcome = retry(&config, |_attempt| async move {
///     Ok::<_, String>("success".to_string())
/// }, |_err| true).await;
/// # }
/// ```
pub async fn retry<T, E, Fut, F, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt: u32 = 0;

    loop {
        let result = operation(attempt).await;
        attempt = attempt.saturating_add(1);
        match result {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                };
            },
            Err(error) if !should_retry(&error) => {
                return RetryOutcome::Aborted {
                    error,
                    attempts: attempt,
                };
            },
            Err(error) if !config.should_retry(attempt) => {
                return RetryOutcome::Exhausted {
                    error,
                    attempts: attempt,
                };
            },
            Err(_) => {
                tokio::time::sleep(config.delay_for_attempt(attempt)).await;
            },
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
