//! Typed backend operations
//!
//! Every method builds a fresh [`RequestDescriptor`] and sends it through the
//! [`RequestExecutor`], so all of them share the retry, refresh and offline
//! behavior. Streaming operations forward decoded events to a caller-owned
//! channel and return the final answer.

use std::sync::Arc;
use std::time::Duration;

use agrilink_domain::{
    ChatMessageRequest, CommunityQuestion, Config, DetectionSubmission, FormPart, LoginResponse,
    NewQuestion, Operation, QueryRequest, RegisterRequest, RequestDescriptor, SplitMode,
    StatusResponse, StreamEvent, TokenPair, UserProfile, VoteRequest,
};
use reqwest::Response;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::errors::ApiError;
use super::executor::RequestExecutor;
use crate::streaming::{read_stream, StreamedAnswer};

/// API commands for backend operations
pub struct ApiCommands {
    executor: Arc<RequestExecutor>,
    split_mode: SplitMode,
    chat_timeout: Duration,
    health_timeout: Duration,
}

impl ApiCommands {
    /// Create a new commands instance
    ///
    /// # Arguments
    ///
    /// * `executor` - Request executor shared with the reconnect watcher
    /// * `config` - Stream split mode and per-operation timeouts
    pub fn new(executor: Arc<RequestExecutor>, config: &Config) -> Self {
        Self {
            executor,
            split_mode: config.stream.split_mode,
            chat_timeout: config.api.chat_timeout(),
            health_timeout: config.api.health_timeout(),
        }
    }

    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    // === Account Operations ===

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<StatusResponse, ApiError> {
        let descriptor = RequestDescriptor::post(Operation::Register).json(request)?;
        let ack: StatusResponse = self.json(descriptor).await?;
        info!("account registered");
        Ok(ack)
    }

    /// Exchange credentials for a token pair and persist it.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let descriptor = RequestDescriptor::post(Operation::Login).multipart(vec![
            FormPart::text("username", username),
            FormPart::text("password", password),
        ]);
        let response: LoginResponse = self.json(descriptor).await?;
        let pair = TokenPair::from(response);

        self.executor.auth().tokens().save(&pair).await?;
        info!(has_refresh_token = pair.has_refresh_token(), "signed in");
        Ok(pair)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.executor.auth().logout().await
    }

    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.json(RequestDescriptor::get(Operation::Profile)).await
    }

    /// Delete the signed-in account and drop the local tokens.
    #[instrument(skip(self))]
    pub async fn delete_account(&self) -> Result<(), ApiError> {
        self.executor.execute(RequestDescriptor::delete(Operation::Profile)).await?;
        self.executor.auth().tokens().clear().await?;
        info!("account deleted");
        Ok(())
    }

    // === Detection ===

    #[instrument(skip(self, submission), fields(farm_id = %submission.farm_id, bytes = submission.image.len()))]
    pub async fn submit_detection(
        &self,
        submission: DetectionSubmission,
    ) -> Result<serde_json::Value, ApiError> {
        let mut parts = vec![
            FormPart::file("image", submission.filename, submission.content_type, submission.image),
            FormPart::text("farm_id", submission.farm_id),
        ];
        if let Some(metadata) = submission.metadata {
            parts.push(FormPart::text("metadata", metadata));
        }
        self.json(RequestDescriptor::post(Operation::SubmitDetection).multipart(parts)).await
    }

    // === Streamed Answers ===

    #[instrument(skip(self, request, sink), fields(lang = %request.lang))]
    pub async fn query(
        &self,
        request: &QueryRequest,
        sink: mpsc::Sender<StreamEvent>,
    ) -> Result<StreamedAnswer, ApiError> {
        let descriptor = RequestDescriptor::post(Operation::Query).json(request)?;
        self.stream(descriptor, sink).await
    }

    #[instrument(skip(self, request, sink), fields(lang = %request.lang))]
    pub async fn stream_query(
        &self,
        request: &QueryRequest,
        sink: mpsc::Sender<StreamEvent>,
    ) -> Result<StreamedAnswer, ApiError> {
        let descriptor = RequestDescriptor::post(Operation::StreamQuery).json(request)?;
        self.stream(descriptor, sink).await
    }

    #[instrument(skip(self, request, sink), fields(session_id = %request.session_id, language = %request.language))]
    pub async fn chat_message(
        &self,
        request: &ChatMessageRequest,
        sink: mpsc::Sender<StreamEvent>,
    ) -> Result<StreamedAnswer, ApiError> {
        let descriptor = RequestDescriptor::post(Operation::ChatMessage)
            .json(request)?
            .timeout(self.chat_timeout);
        self.stream(descriptor, sink).await
    }

    // === Community ===

    #[instrument(skip(self))]
    pub async fn list_questions(&self) -> Result<Vec<CommunityQuestion>, ApiError> {
        let questions: Vec<CommunityQuestion> =
            self.json(RequestDescriptor::get(Operation::CommunityQuestions)).await?;
        debug!(count = questions.len(), "fetched community questions");
        Ok(questions)
    }

    #[instrument(skip(self))]
    pub async fn get_question(&self, id: u64) -> Result<CommunityQuestion, ApiError> {
        self.json(RequestDescriptor::get(Operation::CommunityQuestion(id))).await
    }

    #[instrument(skip(self, question), fields(category = %question.category))]
    pub async fn post_question(&self, question: &NewQuestion) -> Result<StatusResponse, ApiError> {
        let descriptor = RequestDescriptor::post(Operation::CommunityQuestions).json(question)?;
        self.json(descriptor).await
    }

    #[instrument(skip(self, vote), fields(target_type = %vote.target_type, target_id = vote.target_id))]
    pub async fn vote(&self, vote: &VoteRequest) -> Result<StatusResponse, ApiError> {
        let descriptor = RequestDescriptor::post(Operation::Vote).json(vote)?;
        self.json(descriptor).await
    }

    // === Health ===

    /// Probe `/health` once. Any failure, including a timeout or a non-2xx
    /// status, reads as unhealthy.
    #[instrument(skip(self))]
    pub async fn health(&self) -> bool {
        let descriptor = RequestDescriptor::get(Operation::Health).timeout(self.health_timeout);
        let probe = self.executor.auth().send_with_token(&descriptor, None);

        match tokio::time::timeout(self.health_timeout, probe).await {
            Ok(Ok(response)) => {
                let healthy = response.status().is_success();
                debug!(status = %response.status(), healthy, "health check");
                healthy
            }
            Ok(Err(err)) => {
                debug!(error = %err, "health check failed");
                false
            }
            Err(_) => {
                warn!("Health check timeout");
                false
            }
        }
    }

    async fn json<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, ApiError> {
        let response = self.executor.execute(descriptor).await?;
        decode(response).await
    }

    async fn stream(
        &self,
        descriptor: RequestDescriptor,
        sink: mpsc::Sender<StreamEvent>,
    ) -> Result<StreamedAnswer, ApiError> {
        let response = self.executor.execute(descriptor.streaming()).await?;
        read_stream(response, self.split_mode, sink).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::Network { message: format!("failed to read body: {e}"), connect: false })?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}
