//! Application state for the API server.

use std::sync::Arc;

use mirror_core::{ResponseComposer, SafetyPipeline};

/// The wired chat service: pipeline plus composer.
pub struct ChatService {
    pub pipeline: SafetyPipeline,
    pub composer: ResponseComposer,
}

/// Shared application state.
///
/// `chat` is `None` when completion credentials are missing; the chat
/// handler answers 503 without running any pipeline stage.
#[derive(Clone)]
pub struct AppState {
    pub chat: Option<Arc<ChatService>>,
}

impl AppState {
    /// Creates application state with a wired chat service.
    pub fn new(pipeline: SafetyPipeline, composer: ResponseComposer) -> Self {
        Self {
            chat: Some(Arc::new(ChatService { pipeline, composer })),
        }
    }

    /// Creates application state without a chat service.
    pub fn unconfigured() -> Self {
        Self { chat: None }
    }
}
