//! Storage models.

use chrono::{DateTime, Utc};
use mirror_core::SafetyAction;
use serde_json::Value;

/// How much of the evaluated user text the sink keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedactionPolicy {
    /// Store a SHA-256 hash plus a short preview. The default.
    #[default]
    Hashed,
    /// Store the full text. Only for local debugging.
    Raw,
}

/// A guardrail event as persisted.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub id: i64,
    pub rule_id: Option<String>,
    pub action: SafetyAction,
    pub message: String,
    pub text_hash: String,
    pub text_preview: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// A guardrail event about to be inserted.
#[derive(Debug, Clone)]
pub struct NewStoredEvent {
    pub rule_id: Option<String>,
    pub action: SafetyAction,
    pub message: String,
    pub text_hash: String,
    pub text_preview: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}
