//! Capability seam for the external content-moderation classifier.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the moderation boundary.
///
/// Every variant is recoverable: the pipeline fails open on any of them and
/// records the outage in the audit log instead of blocking the user.
#[derive(Debug, Error)]
pub enum ModerationError {
    /// Upstream call failed or returned an unusable response.
    #[error("moderation service unavailable: {0}")]
    Unavailable(String),
    /// Upstream call exceeded its deadline.
    #[error("moderation request timed out")]
    Timeout,
}

/// Boolean content classifier consulted after local rules allow a message.
///
/// Implementations own transport, timeout, and provider choice; the pipeline
/// only sees the flagged bit. No retries: a failed call is reported, not
/// repeated.
#[async_trait]
pub trait ModerationClient: Send + Sync {
    /// Classifies raw user text; `true` means flagged.
    async fn classify(&self, text: &str) -> Result<bool, ModerationError>;
}
