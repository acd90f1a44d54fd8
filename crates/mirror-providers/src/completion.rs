//! Text-completion adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use mirror_core::{CompletionClient, CompletionError, CompletionOptions, ConversationTurn, Role};

/// Default completion model.
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-5.0-nano";

/// Completions are slower than moderation and allowed a generous deadline;
/// the composer falls back to a canned apology on timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP adapter for the response-generation service.
pub struct CompletionApi {
    /// Pre-computed `"Bearer <key>"` header value.
    cached_auth_header: String,
    url: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputItem<'a>>,
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct InputItem<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<Value>,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Pulls the generated text out of a responses payload.
///
/// Prefers the convenience `output_text` field; otherwise walks the output
/// items for the first `output_text`-kind content part, then any part that
/// carries a `text` field.
fn extract_responses_text(body: &ResponsesResponse) -> Option<String> {
    if let Some(text) = body.output_text.as_deref() {
        if !text.trim().is_empty() {
            return Some(text.to_string());
        }
    }

    let parts = body
        .output
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten();

    let mut fallback = None;
    for part in parts {
        let text = part.get("text").and_then(Value::as_str);
        let Some(text) = text else { continue };
        if text.trim().is_empty() {
            continue;
        }
        if part.get("type").and_then(Value::as_str) == Some("output_text") {
            return Some(text.to_string());
        }
        if fallback.is_none() {
            fallback = Some(text.to_string());
        }
    }
    fallback
}

impl CompletionApi {
    /// Adapter against `{base_url}/responses` with the default model and
    /// timeouts.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::with_timeout(base_url, api_key, REQUEST_TIMEOUT)
    }

    /// Adapter with an explicit request deadline.
    pub fn with_timeout(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            cached_auth_header: format!("Bearer {api_key}"),
            url: format!("{}/responses", base_url.trim_end_matches('/')),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(CONNECT_TIMEOUT.min(timeout))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Overrides the completion model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl CompletionClient for CompletionApi {
    async fn complete(
        &self,
        system_context: &str,
        turns: &[ConversationTurn],
        options: CompletionOptions,
    ) -> Result<String, CompletionError> {
        let mut input = Vec::with_capacity(turns.len() + 1);
        input.push(InputItem {
            role: "system",
            content: system_context,
        });
        input.extend(turns.iter().map(|turn| InputItem {
            role: role_name(turn.role),
            content: &turn.content,
        }));

        let request = ResponsesRequest {
            model: &self.model,
            input,
            max_output_tokens: options.max_output_tokens,
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", &self.cached_auth_header)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CompletionError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        let body: ResponsesResponse = response
            .json()
            .await
            .map_err(|err| CompletionError::Transport(err.to_string()))?;

        let text = extract_responses_text(&body).unwrap_or_default();
        debug!(chars = text.len(), "Completion produced reply");
        Ok(text)
    }
}
