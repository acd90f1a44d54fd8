//! Wire models for the chat API.

use serde::{Deserialize, Serialize};

use mirror_core::{ConversationTurn, ProfileContext};

/// POST /chat request body.
///
/// `messages` is most-recent-last; absent means an empty conversation,
/// which is valid. Profile and mood only shape the persona context.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatRequest {
    pub messages: Vec<ConversationTurn>,
    pub profile: Option<ProfileContext>,
    pub detected_mood: Option<String>,
}

/// GET /health response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_request() {
        let req: ChatRequest = serde_json::from_str(
            r#"{
                "messages": [{"role": "user", "content": "halo"}],
                "profile": {"nickname": "Raka"},
                "detectedMood": "senang"
            }"#,
        )
        .unwrap();

        assert_eq!(req.messages.len(), 1);
        assert_eq!(
            req.profile.as_ref().and_then(|p| p.nickname.as_deref()),
            Some("Raka")
        );
        assert_eq!(req.detected_mood.as_deref(), Some("senang"));
    }

    #[test]
    fn absent_fields_default() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.messages.is_empty());
        assert!(req.profile.is_none());
        assert!(req.detected_mood.is_none());
    }
}
