//! Integration tests for the resilience module
//!
//! Exercises the fixed-interval retry executor with a classifying policy,
//! the way the request pipeline drives it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use agrilink_common::resilience::{
    RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryPolicy,
};

/// Custom error type for testing
#[derive(Debug, Clone, PartialEq, Eq)]
enum TestError {
    Unreachable,
    Status(u16),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable => write!(f, "connection refused"),
            Self::Status(code) => write!(f, "status {code}"),
        }
    }
}

impl std::error::Error for TestError {}

/// Retries transport failures and 5xx only
struct TransientOnly;

impl RetryPolicy<TestError> for TransientOnly {
    fn should_retry(&self, error: &TestError, _attempt: u32) -> RetryDecision {
        match error {
            TestError::Unreachable => RetryDecision::Retry,
            TestError::Status(code) => RetryDecision::from(*code >= 500),
        }
    }
}

/// Validates that two server errors followed by success take three attempts
/// separated by the configured fixed delay.
#[tokio::test]
async fn test_two_server_errors_then_success() {
    let delay = Duration::from_millis(40);
    let executor = RetryExecutor::new(RetryConfig::fixed(3, delay), TransientOnly);
    let calls = Arc::new(AtomicU32::new(0));
    let started = Instant::now();

    let result = executor
        .execute(|_| {
            let calls = Arc::clone(&calls);
            async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(TestError::Status(503)),
                    _ => Ok("ok"),
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= delay * 2, "attempts must be spaced by the fixed delay");
}

/// Client errors surface immediately with the original error attached
#[tokio::test]
async fn test_client_error_is_not_retried() {
    let executor =
        RetryExecutor::new(RetryConfig::fixed(3, Duration::from_millis(5)), TransientOnly);
    let calls = AtomicU32::new(0);

    let result = executor
        .execute(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(TestError::Status(404)) }
        })
        .await;

    let err = result.unwrap_err();
    assert!(!err.is_exhausted());
    assert_eq!(err.into_inner(), TestError::Status(404));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Exhaustion reports the attempt count and the final transport error
#[tokio::test]
async fn test_unreachable_host_exhausts_attempts() {
    let executor =
        RetryExecutor::new(RetryConfig::fixed(3, Duration::from_millis(5)), TransientOnly);

    let outcome = executor
        .execute_with_hook(|_| async { Err::<(), _>(TestError::Unreachable) }, |_| {})
        .await;

    assert_eq!(outcome.attempts, 3);
    match outcome.result {
        Err(RetryError::Exhausted { attempts, source }) => {
            assert_eq!(attempts, 3);
            assert_eq!(source, TestError::Unreachable);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

/// The error message names the attempts and the underlying cause
#[test]
fn test_retry_error_display() {
    let err = RetryError::Exhausted { attempts: 3, source: TestError::Status(502) };
    assert_eq!(err.to_string(), "all 3 attempts failed: status 502");
    let source = std::error::Error::source(&err).map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("status 502"));
}
