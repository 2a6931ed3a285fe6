#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use agrilink_core::KeyValueStore;
use agrilink_domain::{ApiConfig, ClientEvent, Config, RetryConfig};
use agrilink_infra::{ApiClient, MemoryKeyValueStore};
use tokio::sync::broadcast;

/// Retry delay used by every integration test
pub const TEST_DELAY_MS: u64 = 25;

/// Client configuration pointing at `base_url` with a short retry delay.
pub fn test_config(base_url: &str) -> Config {
    Config {
        api: ApiConfig {
            base_url: Some(base_url.to_string()),
            request_timeout_secs: 5,
            health_timeout_secs: 1,
            ..ApiConfig::default()
        },
        retry: RetryConfig { max_attempts: 3, delay_ms: TEST_DELAY_MS },
        ..Config::default()
    }
}

/// Client over an in-memory store; the store is returned for inspection.
pub fn test_client(base_url: &str, online: bool) -> (ApiClient, Arc<MemoryKeyValueStore>) {
    let store = Arc::new(MemoryKeyValueStore::new());
    let client = ApiClient::builder()
        .config(test_config(base_url))
        .store(store.clone())
        .initially_online(online)
        .build()
        .expect("client should build");
    (client, store)
}

/// Seed the token keys the client reads.
pub async fn seed_tokens(store: &MemoryKeyValueStore, access: &str, refresh: Option<&str>) {
    store.set("access_token", access).await.expect("access token should be stored");
    if let Some(refresh) = refresh {
        store.set("refresh_token", refresh).await.expect("refresh token should be stored");
    }
}

/// Base address on which nothing is listening.
pub fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// Every event already published on `events`.
pub fn drain_events(events: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// Wait until an event matching `predicate` arrives.
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<ClientEvent>,
    predicate: F,
) -> Option<ClientEvent>
where
    F: Fn(&ClientEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}
