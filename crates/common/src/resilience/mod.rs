//! Resilience patterns for transient failures
//!
//! - **Retry Logic**: bounded, fixed-interval retries driven by a
//!   [`RetryPolicy`] that classifies each error
//!
//! The executor is generic over the error type. The last error is always
//! handed back to the caller unchanged inside [`RetryError`], so callers can
//! decide what an exhausted or non-retryable failure means for them.

pub mod retry;

pub use retry::{
    policies, RetryAttempt, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryOutcome,
    RetryPolicy, RetryResult,
};
