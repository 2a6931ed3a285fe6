//! Bearer authentication for backend requests
//!
//! [`TokenStore`] reads the persisted token pair on every call so a login in
//! another part of the application is picked up without notification.
//! [`AuthHeaderProvider`] turns a [`RequestDescriptor`] into one transport
//! call and owns the single-shot refresh flow for `401` responses.

use std::collections::BTreeMap;
use std::sync::Arc;

use agrilink_core::{EndpointRegistry, KeyValueStore};
use agrilink_domain::constants::{
    ACCESS_TOKEN_KEY, BEARER_PREFIX, CONTENT_TYPE_JSON, REFRESH_TOKEN_KEY,
};
use agrilink_domain::{
    ClientEvent, FormValue, HttpMethod, Operation, RefreshRequest, RefreshResponse, RequestBody,
    RequestDescriptor, TokenPair,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};

use super::errors::ApiError;
use super::events::publish;
use crate::http::HttpClient;

/// Persisted access and refresh tokens
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn access_token(&self) -> Result<Option<String>, ApiError> {
        self.read(ACCESS_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, ApiError> {
        self.read(REFRESH_TOKEN_KEY).await
    }

    /// Persist a pair. A pair without a refresh token removes any stored one.
    pub async fn save(&self, pair: &TokenPair) -> Result<(), ApiError> {
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token).await?;
        match pair.refresh_token.as_deref().filter(|token| !token.is_empty()) {
            Some(refresh_token) => self.store.set(REFRESH_TOKEN_KEY, refresh_token).await?,
            None => self.store.remove(REFRESH_TOKEN_KEY).await?,
        }
        Ok(())
    }

    pub async fn save_access_token(&self, access_token: &str) -> Result<(), ApiError> {
        self.store.set(ACCESS_TOKEN_KEY, access_token).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), ApiError> {
        self.store.remove(ACCESS_TOKEN_KEY).await?;
        self.store.remove(REFRESH_TOKEN_KEY).await?;
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<String>, ApiError> {
        let value = self.store.get(key).await?;
        Ok(value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
    }
}

/// Issues authenticated requests and recovers from expired access tokens
pub struct AuthHeaderProvider {
    http: HttpClient,
    registry: EndpointRegistry,
    tokens: TokenStore,
    events: broadcast::Sender<ClientEvent>,
    /// Serializes refreshes so one expired token triggers one refresh call
    refresh_lock: Mutex<()>,
}

impl AuthHeaderProvider {
    pub fn new(
        http: HttpClient,
        registry: EndpointRegistry,
        tokens: TokenStore,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self { http, registry, tokens, events, refresh_lock: Mutex::new(()) }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn events(&self) -> &broadcast::Sender<ClientEvent> {
        &self.events
    }

    /// Headers computed from the current token
    ///
    /// Multipart bodies get no content type; the transport sets it together
    /// with the form boundary.
    pub async fn headers(&self, multipart: bool) -> Result<BTreeMap<String, String>, ApiError> {
        let token = self.tokens.access_token().await?;
        Ok(computed_headers(token.as_deref(), multipart))
    }

    /// Send `descriptor` once, refreshing the token at most once on `401`.
    ///
    /// Any response is returned as-is, including a second `401` and other
    /// non-success statuses.
    ///
    /// # Errors
    /// Transport failures (including a refresh call that failed in transit or
    /// with a 5xx, which leaves the tokens in place), or
    /// [`ApiError::ReauthenticationRequired`] when the refresh was refused.
    #[instrument(skip(self, descriptor), fields(endpoint = %descriptor.endpoint))]
    pub async fn request(&self, descriptor: &RequestDescriptor) -> Result<Response, ApiError> {
        let token = self.tokens.access_token().await?;
        let response = self.send_with_token(descriptor, token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !refreshes_on_unauthorized(descriptor)
        {
            return Ok(response);
        }
        drop(response);

        debug!("access token rejected");
        let token = self.refresh_after_unauthorized(token.as_deref()).await?;
        self.send_with_token(descriptor, Some(&token)).await
    }

    /// Issue `descriptor` with an explicit token and no refresh handling.
    pub async fn send_with_token(
        &self,
        descriptor: &RequestDescriptor,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = self.registry.resolve(descriptor.endpoint)?;
        let options = &descriptor.options;
        let multipart = options.body.as_ref().is_some_and(RequestBody::is_multipart);
        let headers = merge_headers(&options.headers, computed_headers(token, multipart));

        let mut builder =
            self.http.request(to_method(options.method), url).headers(to_header_map(&headers)?);
        builder = attach_body(builder, options.body.as_ref())?;

        let timeout = options.timeout.unwrap_or_else(|| self.http.timeout());
        if options.timeout.is_some() {
            builder = builder.timeout(timeout);
        }

        self.http.send(builder).await.map_err(|err| ApiError::from_transport(err, timeout))
    }

    /// Log out locally. The backend keeps no session state to revoke.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.tokens.clear().await?;
        info!("signed out");
        Ok(())
    }

    async fn refresh_after_unauthorized(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.tokens.access_token().await?;
        if let Some(current) = current.filter(|current| Some(current.as_str()) != stale) {
            debug!("token already replaced by a concurrent refresh");
            return Ok(current);
        }

        let Some(refresh_token) = self.tokens.refresh_token().await? else {
            return Err(self.require_reauthentication("no refresh token stored").await);
        };

        match self.refresh(&refresh_token).await {
            Ok(access_token) => Ok(access_token),
            // Transport and 5xx failures leave the session for the executor to retry.
            Err(err) if err.should_retry() => {
                warn!(error = %err, "token refresh did not reach a verdict");
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed");
                Err(self.require_reauthentication("refresh rejected").await)
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let descriptor = RequestDescriptor::post(Operation::RefreshToken)
            .json(&RefreshRequest { refresh_token: refresh_token.to_string() })?;
        let response = self.send_with_token(&descriptor, None).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, body));
        }

        let refreshed: RefreshResponse =
            response.json().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        match refreshed.refresh_token.filter(|token| !token.is_empty()) {
            Some(rotated) => {
                self.tokens.save(&TokenPair::new(refreshed.access_token.clone(), Some(rotated))).await?;
            }
            None => self.tokens.save_access_token(&refreshed.access_token).await?,
        }

        info!("access token refreshed");
        Ok(refreshed.access_token)
    }

    async fn require_reauthentication(&self, reason: &str) -> ApiError {
        warn!(reason, "re-authentication required");
        if let Err(err) = self.tokens.clear().await {
            warn!(error = %err, "failed to clear stored tokens");
        }
        publish(&self.events, ClientEvent::ReauthenticationRequired);
        ApiError::ReauthenticationRequired
    }
}

/// Credential exchanges answer `401` for bad credentials, not stale tokens.
fn refreshes_on_unauthorized(descriptor: &RequestDescriptor) -> bool {
    !matches!(descriptor.endpoint, Operation::Login | Operation::RefreshToken)
}

fn computed_headers(token: Option<&str>, multipart: bool) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    if !multipart {
        headers.insert(CONTENT_TYPE.as_str().to_string(), CONTENT_TYPE_JSON.to_string());
    }
    if let Some(token) = token {
        headers.insert(AUTHORIZATION.as_str().to_string(), format!("{BEARER_PREFIX}{token}"));
    }
    headers
}

/// Caller headers plus computed ones. The computed `Authorization` replaces
/// the caller's; a caller `Content-Type` is kept.
fn merge_headers(
    caller: &BTreeMap<String, String>,
    computed: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let find = |headers: &BTreeMap<String, String>, name: &str| {
        headers.keys().find(|key| key.eq_ignore_ascii_case(name)).cloned()
    };

    let mut merged = caller.clone();
    for (name, value) in computed {
        let existing = find(&merged, &name);
        if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) && existing.is_some() {
            continue;
        }
        if let Some(existing) = existing {
            merged.remove(&existing);
        }
        merged.insert(name, value);
    }
    merged
}

fn to_header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ApiError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::Config(format!("invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::Config(format!("invalid value for header '{name}': {e}")))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn attach_body(builder: RequestBuilder, body: Option<&RequestBody>) -> Result<RequestBuilder, ApiError> {
    match body {
        None => Ok(builder),
        Some(RequestBody::Json(value)) => Ok(builder.body(serde_json::to_vec(value)?)),
        Some(RequestBody::Multipart(parts)) => {
            let mut form = Form::new();
            for part in parts {
                form = match &part.value {
                    FormValue::Text { value } => form.text(part.name.clone(), value.clone()),
                    FormValue::File { filename, content_type, bytes } => {
                        let mut file = Part::bytes(bytes.clone()).file_name(filename.clone());
                        if let Some(content_type) = content_type {
                            file = file.mime_str(content_type).map_err(|e| {
                                ApiError::Config(format!("invalid content type '{content_type}': {e}"))
                            })?;
                        }
                        form.part(part.name.clone(), file)
                    }
                };
            }
            Ok(builder.multipart(form))
        }
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}
