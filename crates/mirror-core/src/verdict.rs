//! Safety verdicts: the pipeline's final classification for one message.

use serde::{Deserialize, Serialize};

use crate::policy::{PolicyRule, SafetyAction};

/// Which stage of the pipeline decided the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictSource {
    /// The in-process policy rule scan.
    LocalPolicy,
    /// The external moderation classifier.
    ModerationApi,
}

impl VerdictSource {
    /// String form used in audit metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictSource::LocalPolicy => "local-policy",
            VerdictSource::ModerationApi => "moderation-api",
        }
    }
}

/// The rule behind a local warn/escalate, detached from the rule set.
///
/// Carries only what replies and audit events need; the compiled matchers
/// stay with the rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredRule {
    pub id: String,
    pub description: String,
    pub guidance: Option<String>,
}

impl From<&PolicyRule> for TriggeredRule {
    fn from(rule: &PolicyRule) -> Self {
        Self {
            id: rule.id.clone(),
            description: rule.description.clone(),
            guidance: rule.guidance.clone(),
        }
    }
}

/// Final safety classification for one message.
///
/// Produced fresh per message and never persisted beyond the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyVerdict {
    /// What the pipeline decided.
    pub action: SafetyAction,
    /// Rule behind a local warn/escalate. `None` for plain allows and for
    /// moderation escalations.
    pub rule: Option<TriggeredRule>,
    /// Stage that decided.
    pub source: VerdictSource,
}

impl SafetyVerdict {
    /// Allow with no rule involved.
    pub fn allow() -> Self {
        Self {
            action: SafetyAction::Allow,
            rule: None,
            source: VerdictSource::LocalPolicy,
        }
    }

    /// Verdict produced by a local rule match.
    pub fn local_match(rule: &PolicyRule) -> Self {
        Self {
            action: rule.action,
            rule: Some(TriggeredRule::from(rule)),
            source: VerdictSource::LocalPolicy,
        }
    }

    /// Escalation raised by the moderation classifier.
    pub fn flagged_by_moderation() -> Self {
        Self {
            action: SafetyAction::Escalate,
            rule: None,
            source: VerdictSource::ModerationApi,
        }
    }

    /// True when the message may proceed to the completion service.
    pub fn is_allow(&self) -> bool {
        self.action == SafetyAction::Allow
    }

    /// Id of the deciding rule, when one exists.
    pub fn rule_id(&self) -> Option<&str> {
        self.rule.as_ref().map(|r| r.id.as_str())
    }

    /// Guidance of the deciding rule, when it carries one.
    pub fn guidance(&self) -> Option<&str> {
        self.rule.as_ref().and_then(|r| r.guidance.as_deref())
    }
}
