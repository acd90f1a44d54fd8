//! Guardrail audit events and the logging seam.
//!
//! Every non-allow decision (and every moderation outage) produces a
//! [`GuardrailEvent`]. Sinks are best-effort: a failing sink is an
//! operational problem, never a user-facing one, so callers log the error
//! and keep the verdict they already reached.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::policy::SafetyAction;

/// Error from an audit sink.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Sink-specific write failure, described for operator logs only.
    #[error("audit sink failed: {0}")]
    Sink(String),
}

/// Append-only record of a safety-relevant decision.
///
/// Owned by the audit sink once recorded; the pipeline never reads events
/// back.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailEvent {
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
    /// Rule behind the decision, when local policy decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Action the pipeline decided.
    pub action: SafetyAction,
    /// Human-readable summary of why the event exists.
    pub message: String,
    /// The user text that was evaluated. Raw here; sinks may redact.
    pub user_text: String,
    /// Free-form context for observability.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl GuardrailEvent {
    /// New event stamped with the current time.
    pub fn new(
        action: SafetyAction,
        message: impl Into<String>,
        user_text: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            rule_id: None,
            action,
            message: message.into(),
            user_text: user_text.into(),
            metadata: Map::new(),
        }
    }

    /// Attaches the deciding rule's id.
    pub fn with_rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Attaches one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Sink for guardrail events.
///
/// `record` must return quickly and must not panic. Callers treat `Err` as
/// an operational detail; it never changes a verdict or surfaces to users.
pub trait AuditLogger: Send + Sync {
    fn record(&self, event: &GuardrailEvent) -> Result<(), AuditError>;
}

/// Default sink: one structured tracing line per event.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditLog;

impl AuditLogger for TracingAuditLog {
    fn record(&self, event: &GuardrailEvent) -> Result<(), AuditError> {
        let payload =
            serde_json::to_string(event).map_err(|e| AuditError::Sink(e.to_string()))?;
        info!(
            target: "guardrail_event",
            action = event.action.as_str(),
            rule_id = event.rule_id.as_deref(),
            %payload,
            "Guardrail event"
        );
        Ok(())
    }
}
