//! Integration tests for the retrying request executor
//!
//! **Coverage:**
//! - Success on the first attempt: one network call, nothing queued
//! - Transient 5xx: retried with the fixed delay until success
//! - Client errors: never retried
//! - Offline exhaustion: exactly one persisted queue entry and a queued error
//! - Online exhaustion: the last error surfaces and nothing is queued
//!
//! **Infrastructure:**
//! - WireMock HTTP server standing in for the backend
//! - In-memory key-value store behind the offline queue

#[path = "support.rs"]
mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use agrilink_domain::{
    ClientEvent, DetectionSubmission, FormValue, Operation, RequestBody, RequestDescriptor,
};
use agrilink_infra::ApiError;
use serde_json::json;
use support::{drain_events, refused_base_url, seed_tokens, test_client, TEST_DELAY_MS};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Fails with `status` for the first `failures` calls, then succeeds.
struct FailThenSucceed {
    calls: Arc<AtomicUsize>,
    failures: usize,
    status: u16,
}

impl Respond for FailThenSucceed {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            ResponseTemplate::new(self.status)
        } else {
            ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" }))
        }
    }
}

fn vote_descriptor() -> RequestDescriptor {
    RequestDescriptor::post(Operation::Vote)
        .json(&json!({ "user_id": "u1", "type": "question", "target_id": 3, "vote": "up" }))
        .unwrap()
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn success_makes_one_call_and_queues_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/community/vote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = test_client(&server.uri(), true);
    let mut events = client.subscribe();

    let response = client.executor().execute(vote_descriptor()).await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(client.executor().queue().is_empty().await.unwrap());
    assert!(drain_events(&mut events).is_empty());
}

#[tokio::test]
async fn stored_access_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer token-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "ravi" })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = test_client(&server.uri(), true);
    seed_tokens(&store, "token-1", None).await;

    let profile = client.commands().profile().await.unwrap();
    assert_eq!(profile.username, "ravi");
}

#[tokio::test]
async fn json_body_is_sent_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/community/vote"))
        .and(body_json(json!({ "user_id": "u1", "type": "question", "target_id": 3, "vote": "up" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = test_client(&server.uri(), true);
    client.executor().execute(vote_descriptor()).await.unwrap();
}

// ============================================================================
// Retry Behavior
// ============================================================================

#[tokio::test]
async fn transient_server_errors_are_retried_with_fixed_delay() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    Mock::given(method("POST"))
        .and(path("/community/vote"))
        .respond_with(FailThenSucceed { calls: calls.clone(), failures: 2, status: 503 })
        .mount(&server)
        .await;

    let (client, _store) = test_client(&server.uri(), true);
    let mut events = client.subscribe();

    let started = Instant::now();
    let response = client.executor().execute(vote_descriptor()).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(elapsed >= Duration::from_millis(2 * TEST_DELAY_MS), "elapsed {elapsed:?}");

    let retries: Vec<_> = drain_events(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            ClientEvent::RetryScheduled(record) => Some(record),
            _ => None,
        })
        .collect();
    assert_eq!(retries.len(), 2);
    assert_eq!(retries[0].attempt, 1);
    assert_eq!(retries[1].attempt, 2);
    assert!(retries.iter().all(|r| r.max_attempts == 3 && r.delay_ms == TEST_DELAY_MS));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/community/questions/7"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such question"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = test_client(&server.uri(), false);

    let err = client.commands().get_question(7).await.unwrap_err();

    match err {
        ApiError::Http { status, body, .. } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such question");
        }
        other => panic!("expected http error, got {other:?}"),
    }
    assert!(client.executor().queue().is_empty().await.unwrap());
}

#[tokio::test]
async fn online_exhaustion_returns_last_error_without_queueing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/community/vote"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let (client, _store) = test_client(&server.uri(), true);

    let err = client.executor().execute(vote_descriptor()).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(client.executor().queue().is_empty().await.unwrap());
}

#[tokio::test]
async fn slow_responses_time_out_and_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/community/vote"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(3)
        .mount(&server)
        .await;

    let (client, _store) = test_client(&server.uri(), true);
    let descriptor = vote_descriptor().timeout(Duration::from_millis(50));

    let err = client.executor().execute(descriptor).await.unwrap_err();

    assert!(matches!(err, ApiError::Timeout(_)), "got {err:?}");
}

// ============================================================================
// Offline Deferral
// ============================================================================

#[tokio::test]
async fn offline_exhaustion_persists_exactly_one_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/community/vote"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let (client, _store) = test_client(&server.uri(), false);
    let mut events = client.subscribe();
    let descriptor = vote_descriptor();

    let err = client.executor().execute(descriptor.clone()).await.unwrap_err();

    let ApiError::Queued { entry_id } = err else {
        panic!("expected queued error, got {err:?}");
    };
    let entries = client.executor().queue().snapshot().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, entry_id);
    assert_eq!(entries[0].endpoint, descriptor.endpoint);
    assert_eq!(entries[0].options, descriptor.options);

    assert!(drain_events(&mut events).contains(&ClientEvent::RequestQueued {
        entry_id,
        endpoint: Operation::Vote,
    }));
}

#[tokio::test]
async fn refused_connection_while_offline_is_queued() {
    let (client, _store) = test_client(&refused_base_url(), false);

    let err = client.executor().execute(vote_descriptor()).await.unwrap_err();

    assert!(err.is_queued(), "got {err:?}");
    assert_eq!(client.executor().queue().len().await.unwrap(), 1);
}

#[tokio::test]
async fn offline_upload_is_queued_with_its_form_parts() {
    let (client, _store) = test_client(&refused_base_url(), false);
    let submission = DetectionSubmission {
        image: vec![0xff, 0xd8, 0xff],
        filename: "leaf.jpg".into(),
        content_type: Some("image/jpeg".into()),
        farm_id: "farm-7".into(),
        metadata: Some(r#"{"crop":"rice"}"#.into()),
    };

    let err = client.commands().submit_detection(submission).await.unwrap_err();

    assert!(err.is_queued(), "got {err:?}");
    let entries = client.executor().queue().snapshot().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].endpoint, Operation::SubmitDetection);
    let Some(RequestBody::Multipart(parts)) = &entries[0].options.body else {
        panic!("expected multipart body");
    };
    assert!(matches!(&parts[0].value, FormValue::File { bytes, .. } if *bytes == [0xff, 0xd8, 0xff]));
    assert_eq!(parts[1].value, FormValue::Text { value: "farm-7".into() });
}

#[tokio::test]
async fn refused_connection_while_online_surfaces_network_error() {
    let (client, _store) = test_client(&refused_base_url(), true);

    let err = client.executor().execute(vote_descriptor()).await.unwrap_err();

    assert!(matches!(err, ApiError::Network { .. }), "got {err:?}");
    assert!(client.executor().queue().is_empty().await.unwrap());
}

#[tokio::test]
async fn login_is_never_queued() {
    let (client, _store) = test_client(&refused_base_url(), false);

    let err = client.commands().login("ravi", "secret").await.unwrap_err();

    assert!(matches!(err, ApiError::Network { .. }), "got {err:?}");
    assert!(client.executor().queue().is_empty().await.unwrap());
}
