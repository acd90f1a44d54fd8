//! API route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::debug;

use mirror_core::OutboundReply;

use crate::error::{ApiError, Result};
use crate::models::{ChatRequest, HealthResponse};
use crate::state::AppState;

/// POST /chat - run one user message through the safety pipeline and
/// compose the reply.
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<OutboundReply>> {
    let Json(req) = payload.map_err(|_| ApiError::InvalidPayload)?;
    let service = state.chat.as_ref().ok_or(ApiError::NotConfigured)?;

    debug!(
        turns = req.messages.len(),
        mood = ?req.detected_mood,
        "Handling chat request"
    );

    let verdict = service.pipeline.evaluate_conversation(&req.messages).await;

    let profile = req.profile.unwrap_or_default();
    let reply = service
        .composer
        .compose(
            &verdict,
            &req.messages,
            &profile,
            req.detected_mood.as_deref(),
        )
        .await;

    Ok(Json(reply))
}

/// GET /health - liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
