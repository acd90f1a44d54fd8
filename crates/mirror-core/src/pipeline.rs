//! The safety pipeline: local rules first, moderation second, audit always.
//!
//! Per message the stages are fixed: run the local policy scan, and only
//! when it allows consult the external moderation classifier. A local
//! warn/escalate short-circuits moderation; local rules are the
//! authoritative severe-case detector and are never downgraded by a
//! moderation miss. A moderation outage fails open, but the outage itself
//! is audited so operators can see when the secondary net was down.
//!
//! Audit writes for warn/escalate verdicts happen synchronously before the
//! verdict is returned. A failing audit sink is logged and swallowed; it
//! never changes a verdict.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::audit::{AuditLogger, GuardrailEvent};
use crate::conversation::{latest_user_turn, ConversationTurn};
use crate::moderation::{ModerationClient, ModerationError};
use crate::policy::PolicyRuleSet;
use crate::verdict::{SafetyVerdict, VerdictSource};

/// Orchestrates safety evaluation, one independent message at a time.
///
/// Holds no per-request state; share it behind an `Arc` across handlers.
pub struct SafetyPipeline {
    rules: Arc<PolicyRuleSet>,
    moderation: Arc<dyn ModerationClient>,
    audit: Arc<dyn AuditLogger>,
}

impl SafetyPipeline {
    pub fn new(
        rules: Arc<PolicyRuleSet>,
        moderation: Arc<dyn ModerationClient>,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            rules,
            moderation,
            audit,
        }
    }

    /// Decides the verdict for the latest user turn of a conversation.
    ///
    /// A conversation without a user turn has nothing to evaluate and is
    /// allowed.
    pub async fn evaluate_conversation(&self, conversation: &[ConversationTurn]) -> SafetyVerdict {
        match latest_user_turn(conversation) {
            Some(turn) => self.evaluate(&turn.content).await,
            None => SafetyVerdict::allow(),
        }
    }

    /// Decides the verdict for one user utterance.
    pub async fn evaluate(&self, text: &str) -> SafetyVerdict {
        let verdict = self.rules.evaluate(text);
        if !verdict.is_allow() {
            info!(
                action = verdict.action.as_str(),
                rule_id = verdict.rule_id(),
                "Local policy decided"
            );
            self.audit_local(&verdict, text);
            return verdict;
        }

        // Blank input was allowed without consulting any rule; there is
        // nothing for the classifier to read either.
        let cleaned = text.trim();
        if cleaned.is_empty() {
            return verdict;
        }

        debug!("Local policy allows, consulting moderation");
        match self.moderation.classify(cleaned).await {
            Ok(false) => verdict,
            Ok(true) => {
                let flagged = SafetyVerdict::flagged_by_moderation();
                info!("Moderation flagged message, escalating");
                self.audit_moderation_flag(&flagged, text);
                flagged
            }
            Err(err) => {
                warn!(error = %err, "Moderation unavailable, failing open");
                self.audit_moderation_outage(text, &err);
                verdict
            }
        }
    }

    fn audit_local(&self, verdict: &SafetyVerdict, user_text: &str) {
        let message = verdict
            .rule
            .as_ref()
            .map(|r| r.description.clone())
            .unwrap_or_else(|| "Local policy match".to_string());

        let mut event = GuardrailEvent::new(verdict.action, message, user_text)
            .with_metadata("source", Value::from(VerdictSource::LocalPolicy.as_str()));
        if let Some(rule_id) = verdict.rule_id() {
            event = event.with_rule_id(rule_id);
        }
        self.record(event);
    }

    fn audit_moderation_flag(&self, verdict: &SafetyVerdict, user_text: &str) {
        let event = GuardrailEvent::new(
            verdict.action,
            "Moderation classifier flagged the message",
            user_text,
        )
        .with_metadata("source", Value::from(VerdictSource::ModerationApi.as_str()));
        self.record(event);
    }

    fn audit_moderation_outage(&self, user_text: &str, err: &ModerationError) {
        let event = GuardrailEvent::new(
            crate::policy::SafetyAction::Allow,
            "Moderation unavailable, failed open",
            user_text,
        )
        .with_metadata("moderationError", Value::Bool(true))
        .with_metadata("detail", Value::from(err.to_string()));
        self.record(event);
    }

    /// Hands the event to the sink; a sink failure is logged and dropped.
    fn record(&self, event: GuardrailEvent) {
        if let Err(err) = self.audit.record(&event) {
            warn!(error = %err, "Audit sink failed, continuing");
        }
    }
}
