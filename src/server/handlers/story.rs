//! Handlers for the story tools: outline generation plus the single-shot
//! develop, analyze and script helpers.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{or_default, user_id, write_history};
use crate::client::LlmConfig;
use crate::history::{HistoryRecord, TOOL_STORY_PROMPT};
use crate::llm_call::LlmCall;
use crate::prompt::{build_analyze_prompt, build_develop_prompt, build_script_prompt, StoryBrief};
use crate::scheduler::generate_outline;
use crate::server::error::AppResult;
use crate::server::state::AppState;
use crate::types::{GenerationRequest, OutputMode, DEFAULT_OUTLINE_MODEL, MAX_SCENES};
use crate::GenerationError;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `POST /api/story/generate`. Omitted fields take their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub genre: Option<String>,
    pub age_group: Option<String>,
    /// Dialogue language code.
    pub language: Option<String>,
    /// `JSON`, `EN` or `ID`.
    pub prompt_language: Option<String>,
    pub story_idea: Option<String>,
    pub character_desc: Option<String>,
    pub moral_lesson: Option<String>,
    /// Integer, integral float (`12.0`) or numeric string (`"12"`).
    #[serde(default, deserialize_with = "lenient_count")]
    pub num_scenes: Option<i64>,
    pub model: Option<String>,
}

/// Accept the number forms browsers send for a numeric form field.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match &value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
                .map(|f| f as i64)
        }),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
                    .map(|f| f as i64)
            })
        }
        Some(_) => None,
    };
    number.map(Some).ok_or_else(|| {
        D::Error::custom(format!(
            "numScenes must be a whole number, got {}",
            value.unwrap_or_default()
        ))
    })
}

impl GenerateBody {
    /// Apply defaults and range checks.
    pub fn into_request(self) -> Result<GenerationRequest, GenerationError> {
        let defaults = GenerationRequest::default();
        let scene_count = match self.num_scenes {
            None => defaults.scene_count,
            Some(n) => u32::try_from(n)
                .ok()
                .filter(|n| (1..=MAX_SCENES).contains(n))
                .ok_or_else(|| {
                    GenerationError::Validation(format!(
                        "numScenes must be between 1 and {MAX_SCENES}, got {n}"
                    ))
                })?,
        };

        Ok(GenerationRequest {
            genre: or_default(self.genre, &defaults.genre),
            age_group: or_default(self.age_group, &defaults.age_group),
            dialog_language: or_default(self.language, &defaults.dialog_language),
            output_mode: self
                .prompt_language
                .as_deref()
                .map(OutputMode::from_code)
                .unwrap_or_default(),
            idea: self.story_idea.unwrap_or_default(),
            characters: self.character_desc.unwrap_or_default(),
            moral: self.moral_lesson.unwrap_or_default(),
            scene_count,
            model: or_default(self.model, DEFAULT_OUTLINE_MODEL),
        })
    }
}

/// Body of `POST /api/story/develop`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevelopBody {
    pub story_idea: Option<String>,
    pub model: Option<String>,
}

/// Body of `POST /api/story/analyze` and `POST /api/story/script`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryBody {
    pub genre: Option<String>,
    pub age_group: Option<String>,
    pub story_idea: Option<String>,
    pub character_desc: Option<String>,
    pub moral_lesson: Option<String>,
    pub model: Option<String>,
}

impl StoryBody {
    fn brief(&self) -> StoryBrief {
        let defaults = GenerationRequest::default();
        StoryBrief {
            genre: or_default(self.genre.clone(), &defaults.genre),
            age_group: or_default(self.age_group.clone(), &defaults.age_group),
            idea: self.story_idea.clone().unwrap_or_default(),
            characters: self.character_desc.clone().unwrap_or_default(),
            moral: self.moral_lesson.clone().unwrap_or_default(),
        }
    }
}

fn tool_call(name: &str, model: Option<String>, config: LlmConfig) -> LlmCall {
    LlmCall::new(name)
        .with_model(model.unwrap_or_default())
        .with_config(config)
}

// ---------------------------------------------------------------------------
// POST /api/story/generate
// ---------------------------------------------------------------------------

/// Generate a scene outline, chunked and retried as needed.
///
/// Returns `{ scenes, prompt_meta }`. One history record is written whether
/// generation succeeds or fails.
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(body) = payload?;
    let ctx = state.exec_ctx()?;
    let request = body.into_request()?;

    let started = Instant::now();
    let outcome = generate_outline(&ctx, &request).await;

    let mut record = HistoryRecord::new(TOOL_STORY_PROMPT, request.effective_model());
    record.user_id = user_id(&headers);
    record.subject = Some(request.genre.clone());
    record.grade = Some(request.age_group.clone());
    record.style = Some(request.output_mode.code().to_string());
    record.topic = Some(request.idea.clone());
    record.scene_count = Some(request.scene_count);
    record.duration_ms = started.elapsed().as_millis() as u64;
    record.meta = json!({
        "language": request.dialog_language,
        "characters": request.characters,
        "moral": request.moral,
    });

    match outcome {
        Ok(result) => {
            let body = result.to_json();
            record.story = Some(result.metadata().title.clone());
            record.response_json = Some(body.clone());
            write_history(&state, record).await;
            Ok(Json(body))
        }
        Err(err) => {
            write_history(&state, record.failed(err.user_message())).await;
            Err(err.into())
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/story/develop
// ---------------------------------------------------------------------------

/// Expand a one-line idea into `{ plot, characters, moral }`.
pub async fn develop(
    State(state): State<AppState>,
    payload: Result<Json<DevelopBody>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(body) = payload?;
    let ctx = state.exec_ctx()?;
    let idea = body
        .story_idea
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| GenerationError::Validation("Missing storyIdea".into()))?;

    let result = tool_call("develop", body.model, LlmConfig::develop())
        .invoke_json(&ctx, &build_develop_prompt(&idea))
        .await?;
    Ok(Json(json!({ "result": result })))
}

// ---------------------------------------------------------------------------
// POST /api/story/analyze
// ---------------------------------------------------------------------------

/// Feasibility review of a story idea.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<StoryBody>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(body) = payload?;
    let ctx = state.exec_ctx()?;

    let analysis = tool_call("analyze", body.model.clone(), LlmConfig::analyze())
        .invoke_json(&ctx, &build_analyze_prompt(&body.brief()))
        .await?;
    Ok(Json(json!({ "analysis": analysis })))
}

// ---------------------------------------------------------------------------
// POST /api/story/script
// ---------------------------------------------------------------------------

/// Free-text multi-scene script.
pub async fn script(
    State(state): State<AppState>,
    payload: Result<Json<StoryBody>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(body) = payload?;
    let ctx = state.exec_ctx()?;

    let script = tool_call("script", body.model.clone(), LlmConfig::script())
        .invoke_text(&ctx, &build_script_prompt(&body.brief()))
        .await?;
    Ok(Json(json!({ "script": script })))
}
