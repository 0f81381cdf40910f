//! Proxy for the AI chat service: keeps a single API surface for the
//! frontend while the model runs behind a separate process.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: Option<String>,
}

#[instrument(skip(state, payload))]
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let text = payload
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("text is required"))?;

    let response = state
        .http
        .post(&state.config.ai_chat_url)
        .json(&serde_json::json!({ "text": text }))
        .send()
        .await
        .map_err(|e| ApiError::upstream("chat service request", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Upstream(anyhow::anyhow!(
            "chat service error: {status}: {body}"
        )));
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| ApiError::upstream("chat service body", e))?;
    Ok(Json(body))
}
