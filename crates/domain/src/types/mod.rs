//! Domain types and models

pub mod api;
pub mod auth;
pub mod events;
pub mod queue;
pub mod request;
pub mod settings;
pub mod stream;

pub use api::{
    ChatMessageRequest, CommunityQuestion, DetectionSubmission, NewQuestion, QueryRequest,
    RegisterRequest, StatusResponse, UserProfile, VoteRequest,
};
pub use auth::{LoginResponse, RefreshRequest, RefreshResponse, TokenPair};
pub use events::{ClientEvent, RetryRecord};
pub use queue::OfflineQueueEntry;
pub use request::{FormPart, FormValue, HttpMethod, Operation, RequestBody, RequestDescriptor, RequestOptions};
pub use settings::Settings;
pub use stream::{AnswerAccumulator, SplitMode, StreamEnvelope, StreamEvent};
