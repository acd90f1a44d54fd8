//! Capability seam for the text-completion service.

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::ConversationTurn;

/// Sampling and budget parameters for one completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Hard cap on generated tokens.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for CompletionOptions {
    /// The production budget: 450 tokens at temperature 0.85.
    fn default() -> Self {
        Self {
            max_output_tokens: 450,
            temperature: 0.85,
        }
    }
}

/// Errors from the completion boundary.
///
/// All variants are recoverable: the composer answers with the fallback
/// apology instead of terminating the conversation.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Service answered with a non-success status.
    #[error("completion service returned {status}: {detail}")]
    Upstream { status: u16, detail: String },
    /// Request exceeded its deadline.
    #[error("completion request timed out")]
    Timeout,
    /// Connection or protocol failure before any status was received.
    #[error("completion transport failed: {0}")]
    Transport(String),
}

impl CompletionError {
    /// HTTP status, when the service produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CompletionError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Opaque text-completion service behind the allow path.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generates the assistant reply for a persona context plus the trailing
    /// conversation window.
    ///
    /// Implementations enforce a request timeout and perform no retries.
    async fn complete(
        &self,
        system_context: &str,
        turns: &[ConversationTurn],
        options: CompletionOptions,
    ) -> Result<String, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_production_budget() {
        let options = CompletionOptions::default();
        assert_eq!(options.max_output_tokens, 450);
        assert_eq!(options.temperature, 0.85);
    }

    #[test]
    fn status_only_present_for_upstream_errors() {
        let upstream = CompletionError::Upstream {
            status: 429,
            detail: "rate limited".into(),
        };
        assert_eq!(upstream.status(), Some(429));
        assert_eq!(CompletionError::Timeout.status(), None);
        assert_eq!(
            CompletionError::Transport("connection reset".into()).status(),
            None
        );
    }
}
