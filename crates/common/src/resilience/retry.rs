//! Fixed-interval retry with pluggable error classification
//!
//! The executor runs an operation up to `max_attempts` times, sleeping a
//! constant delay between attempts. A [`RetryPolicy`] decides per error
//! whether another attempt is worthwhile. There is no backoff growth and no
//! jitter: every gap between attempts is the same length.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Terminal failure of a retried operation
///
/// Both variants carry the error produced by the final attempt.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every allowed attempt failed with a retryable error
    #[error("all {attempts} attempts failed: {source}")]
    Exhausted { attempts: u32, source: E },

    /// The policy refused to retry this error
    #[error("non-retryable failure on attempt {attempt}: {source}")]
    NonRetryable { attempt: u32, source: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::NonRetryable { attempt, .. } => *attempt,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Discard retry bookkeeping and return the last error
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { source, .. } | Self::NonRetryable { source, .. } => source,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution including result and summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    /// Time spent sleeping between attempts
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// `attempt` is the 1-based number of the attempt that just failed.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Stop,
}

impl From<bool> for RetryDecision {
    fn from(retry: bool) -> Self {
        if retry {
            Self::Retry
        } else {
            Self::Stop
        }
    }
}

/// Bounds for the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first; values below 1 are treated as 1
    pub max_attempts: u32,
    /// Constant pause between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, delay: Duration::from_millis(1000) }
    }
}

impl RetryConfig {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// A failed attempt that is about to be retried
#[derive(Debug)]
pub struct RetryAttempt<'a, E> {
    /// 1-based number of the attempt that failed
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
    pub error: &'a E,
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_hook(operation, |_| {}).await.into_result()
    }

    /// Execute an operation, calling `on_retry` before each delay.
    ///
    /// The operation receives the 1-based attempt number.
    #[instrument(skip_all, fields(max_attempts = self.config.attempt_limit()))]
    pub async fn execute_with_hook<F, Fut, T, E, H>(
        &self,
        mut operation: F,
        mut on_retry: H,
    ) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnMut(&RetryAttempt<'_, E>),
    {
        let max_attempts = self.config.attempt_limit();
        let mut total_delay = Duration::ZERO;
        let mut attempt = 1;

        loop {
            debug!(attempt, max_attempts, "executing operation");

            // The failed attempt's error is released before sleeping.
            let delay = {
                let error = match operation(attempt).await {
                    Ok(value) => {
                        if attempt > 1 {
                            debug!(attempt, "operation succeeded after retries");
                        }
                        return RetryOutcome {
                            result: Ok(value),
                            attempts: attempt,
                            total_delay,
                        };
                    }
                    Err(error) => error,
                };

                if self.policy.should_retry(&error, attempt) == RetryDecision::Stop {
                    debug!(attempt, error = %error, "retry policy declined to retry");
                    return RetryOutcome {
                        result: Err(RetryError::NonRetryable { attempt, source: error }),
                        attempts: attempt,
                        total_delay,
                    };
                }

                if attempt >= max_attempts {
                    warn!(attempts = attempt, error = %error, "all retry attempts exhausted");
                    return RetryOutcome {
                        result: Err(RetryError::Exhausted { attempts: attempt, source: error }),
                        attempts: attempt,
                        total_delay,
                    };
                }

                let delay = self.config.delay;
                on_retry(&RetryAttempt { attempt, max_attempts, delay, error: &error });
                delay
            };

            tokio::time::sleep(delay).await;
            total_delay += delay;
            attempt += 1;
        }
    }
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Retries on any error
    #[derive(Debug, Clone, Copy)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retries
    #[derive(Debug, Clone, Copy)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug, Clone, Copy)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E) -> bool,
    {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::from((self.predicate)(error))
        }
    }
}
