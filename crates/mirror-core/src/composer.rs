//! Turns pipeline verdicts into outbound replies.
//!
//! Allow is the only branch that touches the completion service; warn and
//! escalate answer with fixed in-voice texts and carry the rule's guidance
//! in the envelope. A completion failure is recoverable: the user gets the
//! fallback apology and the conversation continues.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::completion::{CompletionClient, CompletionOptions};
use crate::conversation::{context_window, ConversationTurn};
use crate::persona::{build_persona_context, ProfileContext};
use crate::policy::SafetyAction;
use crate::verdict::SafetyVerdict;

/// Fallback apology when the completion service cannot answer.
pub const FALLBACK_REPLY: &str =
    "Aku lagi kesulitan tersambung ke otak AI-ku. Coba lagi sebentar, ya. 🌧";

/// Fixed reply for warn verdicts; the guidance rides in the envelope.
pub const WARN_REPLY: &str = "Terima kasih sudah berbagi. Aku akan menjawab dengan ekstra \
     hati-hati ya, dan kalau kamu mau, aku bisa bantu hubungkan kamu ke pendamping manusia. 💛";

/// Fixed reply for escalate verdicts.
pub const ESCALATE_REPLY: &str = "Terima kasih sudah cerita. Aku khawatir kamu sedang dalam \
     kondisi yang perlu bantuan profesional. Coba hubungi hotline darurat atau orang terpercaya ya 💛";

/// Envelope metadata the client state machine reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMeta {
    /// The pipeline's decision for this turn.
    pub action: SafetyAction,
    /// Deciding rule, when local policy decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Operator guidance from the deciding rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
    /// True when the message is the fallback apology instead of a real
    /// completion.
    #[serde(default, skip_serializing_if = "is_false")]
    pub degraded: bool,
}

impl ReplyMeta {
    fn for_verdict(verdict: &SafetyVerdict) -> Self {
        Self {
            action: verdict.action,
            rule_id: verdict.rule_id().map(str::to_owned),
            guidance: verdict.guidance().map(str::to_owned),
            degraded: false,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Reply envelope returned to the client for every branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundReply {
    pub message: String,
    pub meta: ReplyMeta,
}

/// Builds the outbound reply for a decided verdict.
pub struct ResponseComposer {
    completion: Arc<dyn CompletionClient>,
    options: CompletionOptions,
}

impl ResponseComposer {
    /// Composer with the production completion budget.
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self {
            completion,
            options: CompletionOptions::default(),
        }
    }

    /// Overrides the completion budget.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Composes the reply for a verdict.
    ///
    /// `conversation` is the full most-recent-last sequence; only the
    /// trailing window is forwarded to the completion service.
    pub async fn compose(
        &self,
        verdict: &SafetyVerdict,
        conversation: &[ConversationTurn],
        profile: &ProfileContext,
        detected_mood: Option<&str>,
    ) -> OutboundReply {
        match verdict.action {
            SafetyAction::Allow => {
                self.compose_allowed(verdict, conversation, profile, detected_mood)
                    .await
            }
            SafetyAction::Warn => OutboundReply {
                message: WARN_REPLY.to_string(),
                meta: ReplyMeta::for_verdict(verdict),
            },
            SafetyAction::Escalate => OutboundReply {
                message: ESCALATE_REPLY.to_string(),
                meta: ReplyMeta::for_verdict(verdict),
            },
        }
    }

    async fn compose_allowed(
        &self,
        verdict: &SafetyVerdict,
        conversation: &[ConversationTurn],
        profile: &ProfileContext,
        detected_mood: Option<&str>,
    ) -> OutboundReply {
        let persona = build_persona_context(profile, detected_mood);
        let window = context_window(conversation);

        match self.completion.complete(&persona, window, self.options).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    warn!("Completion returned empty text, serving fallback");
                    return Self::degraded_reply();
                }
                OutboundReply {
                    message: text.to_string(),
                    meta: ReplyMeta::for_verdict(verdict),
                }
            }
            Err(err) => {
                warn!(status = err.status(), error = %err, "Completion failed, serving fallback");
                Self::degraded_reply()
            }
        }
    }

    fn degraded_reply() -> OutboundReply {
        OutboundReply {
            message: FALLBACK_REPLY.to_string(),
            meta: ReplyMeta {
                action: SafetyAction::Allow,
                rule_id: None,
                guidance: None,
                degraded: true,
            },
        }
    }
}
