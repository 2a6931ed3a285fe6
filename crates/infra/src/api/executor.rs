//! Resilient request execution
//!
//! [`RequestExecutor::execute`] wraps every request in a bounded,
//! fixed-interval retry loop. When the last attempt fails for a transient
//! reason while the client is offline, the request is parked in the
//! [`OfflineQueue`] and the caller gets [`ApiError::Queued`] instead of the
//! transport error. [`RequestExecutor::process_offline_queue`] drains the
//! queue once connectivity returns.

use std::sync::Arc;

use agrilink_common::resilience::{
    RetryAttempt, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryPolicy,
};
use agrilink_core::{ConnectivityStatus, OfflineQueue};
use agrilink_domain::{ClientEvent, Operation, RequestDescriptor, RetryRecord};
use reqwest::Response;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};

use super::auth::AuthHeaderProvider;
use super::errors::ApiError;
use super::events::publish;

/// Retries exactly the errors [`ApiError::should_retry`] accepts
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiRetryPolicy;

impl RetryPolicy<ApiError> for ApiRetryPolicy {
    fn should_retry(&self, error: &ApiError, _attempt: u32) -> RetryDecision {
        error.should_retry().into()
    }
}

/// Result of one pass over the offline queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Entries left in the queue after the pass
    pub remaining: usize,
}

pub struct RequestExecutor {
    auth: Arc<AuthHeaderProvider>,
    queue: Arc<OfflineQueue>,
    connectivity: Arc<dyn ConnectivityStatus>,
    retry: RetryExecutor<ApiRetryPolicy>,
    events: broadcast::Sender<ClientEvent>,
    replay_lock: Mutex<()>,
}

impl RequestExecutor {
    pub fn new(
        auth: Arc<AuthHeaderProvider>,
        queue: Arc<OfflineQueue>,
        connectivity: Arc<dyn ConnectivityStatus>,
        retry: RetryConfig,
    ) -> Self {
        let events = auth.events().clone();
        Self {
            auth,
            queue,
            connectivity,
            retry: RetryExecutor::new(retry, ApiRetryPolicy),
            events,
            replay_lock: Mutex::new(()),
        }
    }

    pub fn auth(&self) -> &Arc<AuthHeaderProvider> {
        &self.auth
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    pub fn retry_config(&self) -> &RetryConfig {
        self.retry.config()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Issue a request with retries and offline deferral.
    ///
    /// Returns only successful (2xx) responses. Other statuses become
    /// [`ApiError::Http`].
    ///
    /// # Errors
    /// [`ApiError::Queued`] when the request was parked for replay, otherwise
    /// the error of the last attempt.
    #[instrument(skip(self, descriptor), fields(endpoint = %descriptor.endpoint, method = %descriptor.method()))]
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<Response, ApiError> {
        let err = match self.execute_with_retries(&descriptor).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        let attempts = err.attempts();
        let exhausted = err.is_exhausted();
        let last = err.into_inner();

        if exhausted && may_defer(descriptor.endpoint) && !self.connectivity.is_online() {
            return Err(self.defer(descriptor, &last).await);
        }

        debug!(attempts, error = %last, "request failed");
        Err(last)
    }

    /// Replay queued requests in insertion order.
    ///
    /// Each entry goes through the same retry loop as [`Self::execute`] but is
    /// never deferred again. A success removes it; a final failure is logged
    /// and the entry stays for the next pass. Returns `None` without touching
    /// the queue if another pass is running.
    #[instrument(skip(self))]
    pub async fn process_offline_queue(&self) -> Result<Option<ReplayReport>, ApiError> {
        let Ok(_guard) = self.replay_lock.try_lock() else {
            debug!("offline queue replay already in progress");
            return Ok(None);
        };

        let entries = self.queue.snapshot().await?;
        if entries.is_empty() {
            debug!("offline queue empty");
            return Ok(Some(ReplayReport::default()));
        }
        info!(count = entries.len(), "replaying offline queue");

        let mut report = ReplayReport::default();
        for entry in entries {
            match self.execute_with_retries(&entry.descriptor()).await {
                Ok(_) => {
                    self.queue.remove(entry.id).await?;
                    report.succeeded += 1;
                }
                Err(err) => {
                    let attempts = err.attempts();
                    let err = err.into_inner();
                    warn!(entry_id = %entry.id, endpoint = %entry.endpoint, attempts, error = %err, "replay failed; entry kept");
                    report.failed += 1;
                }
            }
        }
        report.remaining = self.queue.len().await?;

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            remaining = report.remaining,
            "offline queue replay finished"
        );
        publish(
            &self.events,
            ClientEvent::QueueReplayed {
                succeeded: report.succeeded,
                failed: report.failed,
                remaining: report.remaining,
            },
        );
        Ok(Some(report))
    }

    async fn execute_with_retries(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<Response, RetryError<ApiError>> {
        let endpoint = descriptor.endpoint;
        let events = &self.events;

        self.retry
            .execute_with_hook(
                |_attempt| self.send_once(descriptor),
                |retry: &RetryAttempt<'_, ApiError>| {
                    warn!(
                        %endpoint,
                        attempt = retry.attempt,
                        max_attempts = retry.max_attempts,
                        delay_ms = retry.delay.as_millis(),
                        error = %retry.error,
                        "request failed; retrying"
                    );
                    publish(
                        events,
                        ClientEvent::RetryScheduled(RetryRecord {
                            endpoint,
                            attempt: retry.attempt,
                            max_attempts: retry.max_attempts,
                            delay_ms: u64::try_from(retry.delay.as_millis()).unwrap_or(u64::MAX),
                            reason: retry.error.to_string(),
                        }),
                    );
                },
            )
            .await
            .into_result()
    }

    async fn send_once(&self, descriptor: &RequestDescriptor) -> Result<Response, ApiError> {
        let response = self.auth.request(descriptor).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, body))
    }

    async fn defer(&self, descriptor: RequestDescriptor, last: &ApiError) -> ApiError {
        let endpoint = descriptor.endpoint;
        match self.queue.enqueue(descriptor).await {
            Ok(entry) => {
                info!(entry_id = %entry.id, %endpoint, error = %last, "offline; request queued");
                publish(&self.events, ClientEvent::RequestQueued { entry_id: entry.id, endpoint });
                ApiError::Queued { entry_id: entry.id }
            }
            Err(err) => {
                warn!(error = %err, "failed to queue request");
                ApiError::from(err)
            }
        }
    }
}

/// Credential exchanges and probes are never persisted for replay.
fn may_defer(endpoint: Operation) -> bool {
    !matches!(
        endpoint,
        Operation::Login | Operation::Register | Operation::RefreshToken | Operation::Health
    )
}
