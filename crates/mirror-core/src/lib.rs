//! Mirror Core - Conversational safety pipeline for the Mirror chat service.
//!
//! Inspects each inbound user message before it reaches the language model:
//! an ordered local policy scan decides first, the external moderation
//! classifier is consulted only when local rules allow, and every non-allow
//! decision is audited. Verdicts drive the response composer (canned reply or
//! completion call) and the client session state machine (escalation
//! hand-off).
//!
//! This crate holds the domain logic only; concrete HTTP adapters live in
//! `mirror-providers`, the durable audit sink in `mirror-storage`, and the
//! inbound HTTP boundary in `mirror-server`.

pub mod audit;
pub mod completion;
pub mod composer;
pub mod conversation;
pub mod moderation;
pub mod persona;
pub mod pipeline;
pub mod policy;
pub mod session;
pub mod verdict;

pub use audit::{AuditError, AuditLogger, GuardrailEvent, TracingAuditLog};
pub use completion::{CompletionClient, CompletionError, CompletionOptions};
pub use composer::{
    OutboundReply, ReplyMeta, ResponseComposer, ESCALATE_REPLY, FALLBACK_REPLY, WARN_REPLY,
};
pub use conversation::{ConversationTurn, Role, CONTEXT_WINDOW_TURNS};
pub use moderation::{ModerationClient, ModerationError};
pub use persona::{build_persona_context, ProfileContext};
pub use pipeline::SafetyPipeline;
pub use policy::{Matcher, PolicyRule, PolicyRuleSet, SafetyAction};
pub use session::{ConversationSession, EscalationState, SessionState};
pub use verdict::{SafetyVerdict, TriggeredRule, VerdictSource};
