//! Client-side conversation session state machine.
//!
//! One explicit state object per conversation, testable without any UI.
//! The session owns the turn history, gates outbound sends, and reacts to
//! reply envelopes. Escalation is sticky: once entered, sending is a no-op
//! until an explicit connect-to-human action, which appends a synthetic
//! assistant turn and returns the session to idle. Further allowed replies
//! never clear escalation on their own.

use serde::{Deserialize, Serialize};

use crate::composer::OutboundReply;
use crate::conversation::{context_window, ConversationTurn};
use crate::persona::ProfileContext;
use crate::policy::SafetyAction;

/// Safety notice shown for warn replies that carry no guidance.
pub const DEFAULT_WARN_NOTICE: &str =
    "Mirror akan menjawab dengan ekstra hati-hati dan siap membantu kamu terhubung ke manusia.";

/// Escalation guidance shown when the envelope carries none.
pub const DEFAULT_ESCALATION_GUIDANCE: &str = "Untuk situasi seintens ini, kita lebih aman \
     ngobrol bareng manusia. Tim support Mirror siap bantu kamu langsung.";

/// Synthetic assistant turn appended by the connect-to-human action.
pub const HUMAN_HANDOFF_REPLY: &str = "Halo, aku Nara dari tim support manusia Mirror. Aku udah \
     baca ceritamu tadi. Yuk kita atur sesi cepat 1:1 biar kamu nggak sendirian. Aku akan hubungi \
     kamu lewat email yang terdaftar sebentar lagi, ya 💛";

/// Error line shown when a send fails without a more specific detail.
pub const DEFAULT_SEND_ERROR: &str = "Maaf, ada kendala. Coba kirim ulang ya.";

/// Where the session is in its send cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Ready to accept input.
    #[default]
    Idle,
    /// A send is in flight; input is disabled.
    Sending,
    /// Conversation is handed off; sending is suppressed until connect.
    Escalated,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Sending => "sending",
            SessionState::Escalated => "escalated",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Active hand-off details, created from an escalate envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationState {
    /// Rule behind the escalation, when local policy decided.
    pub rule_id: Option<String>,
    /// Guidance rendered next to the hand-off affordance.
    pub guidance: String,
}

/// Per-conversation client state.
///
/// Not shared across conversations; create one per chat and pass it through
/// the session controller.
#[derive(Debug, Default)]
pub struct ConversationSession {
    state: SessionState,
    turns: Vec<ConversationTurn>,
    escalation: Option<EscalationState>,
    safety_notice: Option<String>,
    last_error: Option<String>,
}

impl ConversationSession {
    /// Empty session, ready for the first message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session seeded with the profile-aware intro turns.
    ///
    /// Presentation sugar only; the state machine behaves identically with
    /// or without the seed.
    pub fn with_profile_intro(profile: &ProfileContext) -> Self {
        let mut session = Self::new();
        for content in intro_turns(profile) {
            session.turns.push(ConversationTurn::assistant(content));
        }
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Full turn history, most-recent-last.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Active escalation, when the session is handed off.
    pub fn escalation(&self) -> Option<&EscalationState> {
        self.escalation.as_ref()
    }

    /// Notice from the most recent warn reply.
    pub fn safety_notice(&self) -> Option<&str> {
        self.safety_notice.as_deref()
    }

    /// Error line from the most recent failed send.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Starts a send.
    ///
    /// Returns the outbound conversation window when the send is accepted,
    /// or `None` when the input is blank, a send is already in flight, or
    /// the session is escalated. Escalation suppression holds even if the
    /// UI invokes send anyway.
    pub fn begin_send(&mut self, text: &str) -> Option<Vec<ConversationTurn>> {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.state != SessionState::Idle {
            return None;
        }

        self.last_error = None;
        self.turns.push(ConversationTurn::user(trimmed));
        self.state = SessionState::Sending;
        Some(context_window(&self.turns).to_vec())
    }

    /// Applies the reply envelope for the in-flight send.
    ///
    /// Appends the assistant turn and transitions on the envelope's action:
    /// warn stores a safety notice and returns to idle, escalate enters the
    /// sticky escalated state, anything else returns to idle.
    pub fn apply_reply(&mut self, reply: &OutboundReply) {
        self.turns.push(ConversationTurn::assistant(&reply.message));

        match reply.meta.action {
            SafetyAction::Warn => {
                self.safety_notice = Some(
                    reply
                        .meta
                        .guidance
                        .clone()
                        .unwrap_or_else(|| DEFAULT_WARN_NOTICE.to_string()),
                );
                self.state = SessionState::Idle;
            }
            SafetyAction::Escalate => {
                self.escalation = Some(EscalationState {
                    rule_id: reply.meta.rule_id.clone(),
                    guidance: reply
                        .meta
                        .guidance
                        .clone()
                        .unwrap_or_else(|| DEFAULT_ESCALATION_GUIDANCE.to_string()),
                });
                self.state = SessionState::Escalated;
            }
            SafetyAction::Allow => {
                self.state = SessionState::Idle;
            }
        }
    }

    /// Records a failed send and re-enables input.
    ///
    /// An escalated session stays escalated; failures never un-escalate.
    pub fn fail_send(&mut self, detail: Option<&str>) {
        self.last_error = Some(
            detail
                .map(str::to_owned)
                .unwrap_or_else(|| DEFAULT_SEND_ERROR.to_string()),
        );
        if self.state == SessionState::Sending {
            self.state = SessionState::Idle;
        }
    }

    /// Explicit connect-to-human acknowledgement.
    ///
    /// Only meaningful while escalated: appends the synthetic hand-off turn,
    /// clears the escalation, and returns the session to idle. Returns false
    /// in any other state.
    pub fn connect_to_human(&mut self) -> bool {
        if self.state != SessionState::Escalated {
            return false;
        }

        self.turns
            .push(ConversationTurn::assistant(HUMAN_HANDOFF_REPLY));
        self.escalation = None;
        self.state = SessionState::Idle;
        true
    }
}

/// Profile-aware intro texts, in display order.
fn intro_turns(profile: &ProfileContext) -> Vec<String> {
    let nickname = profile.display_nickname();
    let focus = if profile.focus_areas.is_empty() {
        "apa pun yang lagi kamu rasain".to_string()
    } else {
        profile.focus_areas.join(", ")
    };

    let mut persona_bits = Vec::new();
    if let Some(mbti) = profile.mbti_type.as_deref().filter(|v| !v.trim().is_empty()) {
        persona_bits.push(format!("tipe MBTI {mbti}"));
    }
    if let Some(enneagram) = profile
        .enneagram_type
        .as_deref()
        .filter(|v| !v.trim().is_empty())
    {
        persona_bits.push(format!("Enneagram {enneagram}"));
    }
    if let Some(archetype) = profile
        .primary_archetype
        .as_deref()
        .filter(|v| !v.trim().is_empty())
    {
        persona_bits.push(format!("archetype {archetype}"));
    }
    if let Some(zodiac) = profile
        .zodiac_sign
        .as_deref()
        .filter(|v| !v.trim().is_empty())
    {
        persona_bits.push(format!("vibe zodiak {zodiac}"));
    }

    let third = if persona_bits.is_empty() {
        "Belum banyak catatan soal profilmu, jadi bebas banget buat cerita apa pun yang penting \
         buat kamu ya."
            .to_string()
    } else {
        let baseline_touch = match profile.mood_baseline.as_deref() {
            Some("bersemangat") => {
                "Kalau energinya lagi tinggi tapi hati butuh ditenangin, tinggal bilang ya."
            }
            Some("lelah") => "Kita jalan pelan aja, aku akan kasih struktur biar kamu nggak kewalahan.",
            _ => "Kita keep space yang tenang dan mindful bareng-bareng ya.",
        };
        let notes_touch = profile
            .personality_notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| format!(" Aku juga inget catatanmu: {n}."))
            .unwrap_or_default();
        format!(
            "Aku udah nyimpen vibe kamu ({}). {baseline_touch}{notes_touch}",
            persona_bits.join(", ")
        )
    };

    vec![
        format!("Hai {nickname}! ✨ Aku senang banget kamu mampir. Aku siap nemenin kamu ngobrol soal {focus}."),
        "Kalau mau mulai, tarik napas dulu ya... Tarik pelan... buang. Mirror di sini buat kamu, \
         nggak ada judgement sama sekali. 💜"
            .to_string(),
        third,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::{ReplyMeta, ESCALATE_REPLY, WARN_REPLY};
    use crate::conversation::CONTEXT_WINDOW_TURNS;

    fn allow_reply(message: &str) -> OutboundReply {
        OutboundReply {
            message: message.to_string(),
            meta: ReplyMeta {
                action: SafetyAction::Allow,
                rule_id: None,
                guidance: None,
                degraded: false,
            },
        }
    }

    fn warn_reply(guidance: Option<&str>) -> OutboundReply {
        OutboundReply {
            message: WARN_REPLY.to_string(),
            meta: ReplyMeta {
                action: SafetyAction::Warn,
                rule_id: Some("abuse-warn".into()),
                guidance: guidance.map(str::to_owned),
                degraded: false,
            },
        }
    }

    fn escalate_reply(guidance: Option<&str>) -> OutboundReply {
        OutboundReply {
            message: ESCALATE_REPLY.to_string(),
            meta: ReplyMeta {
                action: SafetyAction::Escalate,
                rule_id: Some("self-harm-escalate".into()),
                guidance: guidance.map(str::to_owned),
                degraded: false,
            },
        }
    }

    // ==== Send Gating Tests ====

    #[test]
    fn fresh_session_is_idle_and_empty() {
        let session = ConversationSession::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.turns().is_empty());
        assert!(session.escalation().is_none());
        assert!(session.safety_notice().is_none());
    }

    #[test]
    fn begin_send_appends_turn_and_enters_sending() {
        let mut session = ConversationSession::new();
        let window = session.begin_send("  hai Mirror  ").unwrap();

        assert_eq!(session.state(), SessionState::Sending);
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.turns()[0].content, "hai Mirror");
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut session = ConversationSession::new();
        assert!(session.begin_send("").is_none());
        assert!(session.begin_send("   \n ").is_none());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.turns().is_empty());
    }

    #[test]
    fn send_is_ignored_while_sending() {
        let mut session = ConversationSession::new();
        session.begin_send("pertama").unwrap();
        assert!(session.begin_send("kedua").is_none());
        assert_eq!(session.turns().len(), 1);
    }

    #[test]
    fn window_caps_outbound_turns() {
        let mut session = ConversationSession::new();
        for i in 0..20 {
            session.begin_send(&format!("pesan {i}")).unwrap();
            session.apply_reply(&allow_reply("oke"));
        }

        let window = session.begin_send("terakhir").unwrap();
        assert_eq!(window.len(), CONTEXT_WINDOW_TURNS);
        assert_eq!(window.last().unwrap().content, "terakhir");
    }

    // ==== Reply Handling Tests ====

    #[test]
    fn allow_reply_returns_to_idle() {
        let mut session = ConversationSession::new();
        session.begin_send("hai").unwrap();
        session.apply_reply(&allow_reply("hai juga!"));

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.turns().len(), 2);
        assert_eq!(session.turns()[1].content, "hai juga!");
    }

    #[test]
    fn warn_reply_stores_notice_and_stays_sendable() {
        let mut session = ConversationSession::new();
        session.begin_send("aku dianiaya").unwrap();
        session.apply_reply(&warn_reply(Some("jawab dengan hati-hati")));

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.safety_notice(), Some("jawab dengan hati-hati"));
        assert!(session.begin_send("lanjut cerita").is_some());
    }

    #[test]
    fn warn_without_guidance_uses_default_notice() {
        let mut session = ConversationSession::new();
        session.begin_send("aku dianiaya").unwrap();
        session.apply_reply(&warn_reply(None));
        assert_eq!(session.safety_notice(), Some(DEFAULT_WARN_NOTICE));
    }

    #[test]
    fn escalate_reply_enters_sticky_escalation() {
        let mut session = ConversationSession::new();
        session.begin_send("aku ingin mati").unwrap();
        session.apply_reply(&escalate_reply(Some("hubungkan ke manusia")));

        assert_eq!(session.state(), SessionState::Escalated);
        let escalation = session.escalation().unwrap();
        assert_eq!(escalation.rule_id.as_deref(), Some("self-harm-escalate"));
        assert_eq!(escalation.guidance, "hubungkan ke manusia");
    }

    #[test]
    fn escalate_without_guidance_uses_default() {
        let mut session = ConversationSession::new();
        session.begin_send("aku ingin mati").unwrap();
        session.apply_reply(&escalate_reply(None));
        assert_eq!(
            session.escalation().unwrap().guidance,
            DEFAULT_ESCALATION_GUIDANCE
        );
    }

    #[test]
    fn escalated_session_suppresses_sends_until_connect() {
        let mut session = ConversationSession::new();
        session.begin_send("aku ingin mati").unwrap();
        session.apply_reply(&escalate_reply(None));
        let turns_before = session.turns().len();

        // Two racing send attempts; both must be no-ops.
        assert!(session.begin_send("halo?").is_none());
        assert!(session.begin_send("masih ada?").is_none());
        assert_eq!(session.turns().len(), turns_before);
        assert_eq!(session.state(), SessionState::Escalated);

        assert!(session.connect_to_human());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.escalation().is_none());
        assert_eq!(
            session.turns().last().unwrap().content,
            HUMAN_HANDOFF_REPLY
        );
        assert!(session.begin_send("makasih ya").is_some());
    }

    #[test]
    fn connect_is_noop_outside_escalation() {
        let mut session = ConversationSession::new();
        assert!(!session.connect_to_human());
        session.begin_send("hai").unwrap();
        assert!(!session.connect_to_human());
        assert_eq!(session.turns().len(), 1);
    }

    // ==== Failure Tests ====

    #[test]
    fn failed_send_records_error_and_reenables_input() {
        let mut session = ConversationSession::new();
        session.begin_send("hai").unwrap();
        session.fail_send(None);

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.last_error(), Some(DEFAULT_SEND_ERROR));
        assert!(session.begin_send("coba lagi").is_some());
    }

    #[test]
    fn failure_detail_is_kept_when_given() {
        let mut session = ConversationSession::new();
        session.begin_send("hai").unwrap();
        session.fail_send(Some("Mirror lagi kesulitan menjawab"));
        assert_eq!(session.last_error(), Some("Mirror lagi kesulitan menjawab"));
    }

    #[test]
    fn failure_never_unescalates() {
        let mut session = ConversationSession::new();
        session.begin_send("aku ingin mati").unwrap();
        session.apply_reply(&escalate_reply(None));

        session.fail_send(None);
        assert_eq!(session.state(), SessionState::Escalated);
        assert!(session.escalation().is_some());
    }

    #[test]
    fn next_send_clears_previous_error() {
        let mut session = ConversationSession::new();
        session.begin_send("hai").unwrap();
        session.fail_send(None);
        session.begin_send("coba lagi").unwrap();
        assert!(session.last_error().is_none());
    }

    // ==== Intro Seeding Tests ====

    #[test]
    fn empty_profile_seeds_generic_intro() {
        let session = ConversationSession::with_profile_intro(&ProfileContext::default());
        assert_eq!(session.turns().len(), 3);
        assert!(session.turns()[0].content.contains("teman Mirror"));
        assert!(session.turns()[0]
            .content
            .contains("apa pun yang lagi kamu rasain"));
        assert!(session.turns()[2].content.contains("Belum banyak catatan"));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn full_profile_seeds_personalized_intro() {
        let profile = ProfileContext {
            nickname: Some("Raka".into()),
            focus_areas: vec!["kecemasan".into()],
            mood_baseline: Some("lelah".into()),
            mbti_type: Some("INFP".into()),
            personality_notes: Some("suka musik lo-fi".into()),
            ..ProfileContext::default()
        };
        let session = ConversationSession::with_profile_intro(&profile);

        assert!(session.turns()[0].content.contains("Hai Raka!"));
        assert!(session.turns()[0].content.contains("kecemasan"));
        assert!(session.turns()[2].content.contains("tipe MBTI INFP"));
        assert!(session.turns()[2].content.contains("jalan pelan aja"));
        assert!(session.turns()[2].content.contains("suka musik lo-fi"));
    }

    #[test]
    fn seeded_session_behaves_like_fresh_one() {
        let mut session = ConversationSession::with_profile_intro(&ProfileContext::default());
        let window = session.begin_send("hai").unwrap();
        assert_eq!(session.state(), SessionState::Sending);
        assert_eq!(window.len(), 4);
    }
}
