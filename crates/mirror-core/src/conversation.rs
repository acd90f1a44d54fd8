//! Conversation turns exchanged between the client and the responder.
//!
//! Sequences are ordered most-recent-last. The pipeline only ever inspects
//! the latest user turn; the composer and the client session both cap what
//! they forward at [`CONTEXT_WINDOW_TURNS`].

use serde::{Deserialize, Serialize};

/// Maximum number of trailing turns forwarded to the completion service.
pub const CONTEXT_WINDOW_TURNS: usize = 12;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Latest user turn in a most-recent-last sequence.
pub fn latest_user_turn(turns: &[ConversationTurn]) -> Option<&ConversationTurn> {
    turns.iter().rev().find(|t| t.role == Role::User)
}

/// Trailing window of at most [`CONTEXT_WINDOW_TURNS`] turns.
pub fn context_window(turns: &[ConversationTurn]) -> &[ConversationTurn] {
    let start = turns.len().saturating_sub(CONTEXT_WINDOW_TURNS);
    &turns[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_user_turn_skips_trailing_assistant() {
        let turns = vec![
            ConversationTurn::user("pertama"),
            ConversationTurn::assistant("balasan"),
            ConversationTurn::user("kedua"),
            ConversationTurn::assistant("balasan lagi"),
        ];
        assert_eq!(latest_user_turn(&turns).map(|t| t.content.as_str()), Some("kedua"));
    }

    #[test]
    fn latest_user_turn_handles_no_user() {
        let turns = vec![
            ConversationTurn::system("persona"),
            ConversationTurn::assistant("hai!"),
        ];
        assert!(latest_user_turn(&turns).is_none());
        assert!(latest_user_turn(&[]).is_none());
    }

    #[test]
    fn window_keeps_last_twelve() {
        let turns: Vec<ConversationTurn> = (0..30)
            .map(|i| ConversationTurn::user(format!("pesan {i}")))
            .collect();
        let window = context_window(&turns);
        assert_eq!(window.len(), CONTEXT_WINDOW_TURNS);
        assert_eq!(window[0].content, "pesan 18");
        assert_eq!(window.last().map(|t| t.content.as_str()), Some("pesan 29"));
    }

    #[test]
    fn window_passes_short_conversations_through() {
        let turns = vec![
            ConversationTurn::user("halo"),
            ConversationTurn::assistant("hai!"),
        ];
        assert_eq!(context_window(&turns), turns.as_slice());
    }

    #[test]
    fn role_serializes_lowercase() {
        let turn = ConversationTurn::user("halo");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"halo"}"#);

        let parsed: ConversationTurn =
            serde_json::from_str(r#"{"role":"assistant","content":"hai"}"#).unwrap();
        assert_eq!(parsed.role, Role::Assistant);
    }
}
