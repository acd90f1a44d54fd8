//! Moderation classifier adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mirror_core::{ModerationClient, ModerationError};

/// Default moderation model.
pub const DEFAULT_MODERATION_MODEL: &str = "omni-moderation-latest";

/// Default request deadline. Moderation sits on the hot path of every
/// allowed message, so the budget is deliberately short.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP adapter for the external content-moderation classifier.
pub struct ModerationApi {
    /// Pre-computed `"Bearer <key>"` header value.
    cached_auth_header: String,
    url: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    #[serde(default)]
    flagged: bool,
}

impl ModerationApi {
    /// Adapter against `{base_url}/moderations` with the default model and
    /// timeouts.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::with_timeout(base_url, api_key, REQUEST_TIMEOUT)
    }

    /// Adapter with an explicit request deadline.
    pub fn with_timeout(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            cached_auth_header: format!("Bearer {api_key}"),
            url: format!("{}/moderations", base_url.trim_end_matches('/')),
            model: DEFAULT_MODERATION_MODEL.to_string(),
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(CONNECT_TIMEOUT.min(timeout))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Overrides the moderation model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ModerationClient for ModerationApi {
    async fn classify(&self, text: &str) -> Result<bool, ModerationError> {
        let request = ModerationRequest {
            model: &self.model,
            input: text,
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
                    ModerationError::Timeout
                } else {
                    ModerationError::Unavailable(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModerationError::Unavailable(format!(
                "moderation endpoint returned {status}"
            )));
        }

        let body: ModerationResponse = response
            .json()
            .await
            .map_err(|err| ModerationError::Unavailable(err.to_string()))?;

        let flagged = body.results.iter().any(|r| r.flagged);
        debug!(flagged, "Moderation classified message");
        Ok(flagged)
    }
}
