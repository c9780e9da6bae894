use crate::client::LlmConfig;
use crate::error::Result;
use crate::metadata::GenerationMetadata;
use crate::scene::NormalizedScene;
use crate::GenerationError;
use serde::Serialize;

/// Seconds of video one scene stands for.
pub const SCENE_SECONDS: u32 = 8;

/// Largest number of scenes requested from the service in one call.
pub const CHUNK_SIZE: u32 = 10;

/// Upper bound on scenes per request.
pub const MAX_SCENES: u32 = 99;

/// Default model for outline generation.
pub const DEFAULT_OUTLINE_MODEL: &str = "gemini-2.5-flash-lite";

/// Model substituted for the lite default in structured mode.
pub const STRUCTURED_OUTLINE_MODEL: &str = "gemini-2.5-flash";

/// Default model for the single-shot tools.
pub const DEFAULT_TOOL_MODEL: &str = "gemini-2.5-flash-preview-05-20";

/// How the scenes are requested from the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One JSON object with `prompt_meta` and rich `scenes`.
    #[default]
    Structured,
    /// Flat scene array, stage directions in English.
    PlainEnglish,
    /// Flat scene array, stage directions in Indonesian.
    PlainLocal,
}

impl OutputMode {
    /// Map the wire code (`JSON`, `EN`, `ID`) to a mode.
    ///
    /// Anything that is not `JSON` or `EN` is the local plain mode.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "JSON" => OutputMode::Structured,
            "EN" => OutputMode::PlainEnglish,
            _ => OutputMode::PlainLocal,
        }
    }

    /// Wire code of this mode.
    pub fn code(self) -> &'static str {
        match self {
            OutputMode::Structured => "JSON",
            OutputMode::PlainEnglish => "EN",
            OutputMode::PlainLocal => "ID",
        }
    }

    pub fn is_structured(self) -> bool {
        matches!(self, OutputMode::Structured)
    }

    /// Language for the stage-direction fields of each scene.
    pub fn scene_language(self) -> &'static str {
        match self {
            OutputMode::PlainEnglish => "English",
            OutputMode::Structured | OutputMode::PlainLocal => "Indonesian",
        }
    }

    /// Generation settings for outline calls in this mode.
    pub fn llm_config(self) -> LlmConfig {
        if self.is_structured() {
            LlmConfig::structured_outline()
        } else {
            LlmConfig::plain_outline()
        }
    }
}

/// Parameters of one outline generation.
///
/// Built once per HTTP call and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub genre: String,
    pub age_group: String,
    /// Dialogue language code (`ID`, `EN`, `JV`, ...).
    pub dialog_language: String,
    pub output_mode: OutputMode,
    pub idea: String,
    pub characters: String,
    pub moral: String,
    pub scene_count: u32,
    pub model: String,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            genre: "Dongeng".to_string(),
            age_group: "4-6".to_string(),
            dialog_language: "ID".to_string(),
            output_mode: OutputMode::Structured,
            idea: String::new(),
            characters: String::new(),
            moral: String::new(),
            scene_count: 8,
            model: DEFAULT_OUTLINE_MODEL.to_string(),
        }
    }
}

impl GenerationRequest {
    /// Reject requests the pipeline cannot serve.
    pub fn validate(&self) -> Result<()> {
        if self.scene_count == 0 || self.scene_count > MAX_SCENES {
            return Err(GenerationError::Validation(format!(
                "numScenes must be between 1 and {MAX_SCENES}, got {}",
                self.scene_count
            )));
        }
        if self.model.trim().is_empty() {
            return Err(GenerationError::Validation("model must not be empty".into()));
        }
        Ok(())
    }

    /// Model actually sent upstream.
    ///
    /// Structured batches are too large for the lite default, so it is
    /// swapped for the full model; an explicit choice is kept.
    pub fn effective_model(&self) -> &str {
        if self.output_mode.is_structured() && self.model == DEFAULT_OUTLINE_MODEL {
            STRUCTURED_OUTLINE_MODEL
        } else {
            &self.model
        }
    }

    /// Whether the request is split into several calls.
    pub fn is_chunked(&self) -> bool {
        self.scene_count > CHUNK_SIZE
    }
}

/// The absolute scene range one chunk call asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkWindow {
    /// 0-based offset of the first scene.
    pub offset: u32,
    /// Number of scenes in this window.
    pub count: u32,
    /// Scenes in the whole batch.
    pub total: u32,
}

impl ChunkWindow {
    /// 1-based number of the first scene.
    pub fn first_scene(&self) -> u32 {
        self.offset + 1
    }

    /// 1-based number of the last scene.
    pub fn last_scene(&self) -> u32 {
        self.offset + self.count
    }

    /// Split `total` scenes into consecutive windows of at most `size`.
    pub fn plan(total: u32, size: u32) -> Vec<ChunkWindow> {
        let size = size.max(1);
        (0..total)
            .step_by(size as usize)
            .map(|offset| ChunkWindow {
                offset,
                count: size.min(total - offset),
                total,
            })
            .collect()
    }
}

/// The merged outline handed to the caller and to history.
///
/// Only the merger constructs it; it is read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    scenes: Vec<NormalizedScene>,
    prompt_meta: GenerationMetadata,
}

impl GenerationResult {
    pub(crate) fn new(scenes: Vec<NormalizedScene>, prompt_meta: GenerationMetadata) -> Self {
        Self {
            scenes,
            prompt_meta,
        }
    }

    pub fn scenes(&self) -> &[NormalizedScene] {
        &self.scenes
    }

    pub fn metadata(&self) -> &GenerationMetadata {
        &self.prompt_meta
    }

    /// JSON form (`{ scenes, prompt_meta }`).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
