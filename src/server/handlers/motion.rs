use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{user_id, write_history};
use crate::client::LlmConfig;
use crate::history::{HistoryRecord, TOOL_MOTION_PROMPT};
use crate::llm_call::LlmCall;
use crate::server::error::AppResult;
use crate::server::state::AppState;
use crate::GenerationError;

/// Body of `POST /api/motion/generate`.
#[derive(Debug, Deserialize)]
pub struct MotionBody {
    pub prompt: Option<String>,
    pub model: Option<String>,
}

/// Forward a user-written motion prompt verbatim and return `{ text }`.
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<MotionBody>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(body) = payload?;
    let ctx = state.exec_ctx()?;
    let prompt = body
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| GenerationError::Validation("Invalid prompt".into()))?;

    let call = LlmCall::new("motion")
        .with_model(body.model.unwrap_or_default())
        .with_config(LlmConfig::motion());

    let started = Instant::now();
    let outcome = call.invoke_text(&ctx, &prompt).await;

    let mut record = HistoryRecord::new(TOOL_MOTION_PROMPT, call.model());
    record.user_id = user_id(&headers);
    record.prompt = Some(prompt);
    record.duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(text) => {
            record.response_text = Some(text.clone());
            write_history(&state, record).await;
            Ok(Json(json!({ "text": text })))
        }
        Err(err) => {
            write_history(&state, record.failed(err.user_message())).await;
            Err(err.into())
        }
    }
}
