//! Prompt construction.
//!
//! Every prompt is a template rendered with [`render`]. The templates are the
//! only schema enforcement the completion service gets, so key names and
//! array lengths are spelled out in them.

use crate::metadata::{
    format_duration_id, title_from_idea, DEFAULT_ANIMATION_STYLE, DEFAULT_FINAL_INSTRUCTION,
    DEFAULT_NEGATIVE_PROMPT, TARGET_AUDIENCE,
};
use crate::types::{ChunkWindow, GenerationRequest, SCENE_SECONDS};
use std::collections::BTreeMap;

const NOT_SPECIFIED_CREATIVE: &str = "Not specified, create creatively.";

/// Named values substituted into a template.
///
/// # Example
///
/// ```
/// use classtoon::prompt::{render, PromptVars};
///
/// let vars = PromptVars::new().insert("name", "Kiki");
/// let result = render("Hello {name}, JSON: {{\"key\": \"val\"}}", &vars);
/// assert_eq!(result, r#"Hello Kiki, JSON: {"key": "val"}"#);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptVars(BTreeMap<&'static str, String>);

impl PromptVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Render `template` in a single left-to-right pass.
///
/// `{name}` is replaced with the value of `name`; `{{` and `}}` produce
/// literal braces. Unknown placeholders and lone braces are kept as written.
/// Substituted values are never scanned again, so user text containing
/// braces comes through verbatim.
pub fn render(template: &str, vars: &PromptVars) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
            continue;
        }
        if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
            continue;
        }
        if tail.starts_with('{') {
            if let Some(end) = tail.find('}') {
                if let Some(value) = vars.get(&tail[1..end]) {
                    out.push_str(value);
                    rest = &tail[end + 1..];
                    continue;
                }
            }
        }
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

/// Language name for a dialogue language code. Unknown codes give Indonesian.
pub fn dialogue_language(code: &str) -> &'static str {
    match code.trim().to_ascii_uppercase().as_str() {
        "EN" => "English",
        "JV" => "Javanese",
        "ES" => "Spanish",
        "FR" => "French",
        "ZH" => "Mandarin Chinese",
        "DE" => "German",
        "AR" => "Arabic",
        _ => "Indonesian",
    }
}

const STRUCTURED_FULL: &str = r#"You are a careful JSON generator. Based on the following story details, return a SINGLE JSON object with two top-level keys: "prompt_meta" and "scenes".
STRICT RULES:
- Output MUST be valid JSON and nothing else.
- "scenes" MUST be an array with exactly {count} objects.
- For text fields inside each scene, use {scene_language}. Dialogue lines must use {dialogue_language}.
- Do NOT include markdown backticks.
- Keep every field concise: beat_goal ≤ 1 sentence, visual_description ≤ 2 sentences, key_action ≤ 1 sentence, audio ≤ 1 short phrase, exit_state ≤ 1 sentence, dialog ≤ 1 short line. Do not add extra explanations.

The JSON schema to follow exactly:
{{
  "prompt_meta": {meta_block},
  "scenes": [
    {{
      "scene_number": 1,
      "timecode": "0s–{scene_seconds}s",
      "duration": "{scene_seconds} detik",
      "beat_goal": "string",
      "visual_description": "string",
      "key_action": "string",
      "dialog": "string (can be empty)",
      "audio": "string",
      "exit_state": "string",
      "transition": {{ "type": "cut|fade|dissolve|wipe", "to_scene": 2 }},
      "negative_prompt": "string (optional)"
    }}
  ]
}}

{story_details}
Return ONLY the JSON."#;

const STRUCTURED_CHUNK: &str = r#"You are a careful JSON generator. CONTINUE generating a SINGLE JSON object with two keys: "prompt_meta" and "scenes".
STRICT RULES:
- Output MUST be valid JSON ONLY (no markdown fences or explanations).
- Return exactly {count} NEW scene objects in the "scenes" array for scene numbers {first}..{last} (inclusive) of {total} total.
- Number scenes with their position in the full story ({first} to {last}), not from 1.
- Language: use {scene_language} for all non-dialog fields; dialogue text in {dialogue_language}.
- Keep fields concise: beat_goal ≤ 1 sentence; visual_description ≤ 2 sentences; key_action ≤ 1 sentence; audio ≤ short phrase; exit_state ≤ 1 sentence; dialog ≤ 1 short line.

SCENE OBJECT SHAPE (exact keys and their order are recommended):
{{
  "scene_number": number,
  "timecode": "{timecode_start}s–{timecode_end}s" | "Xs–Ys",
  "duration": "{scene_seconds} detik",
  "beat_goal": "...",
  "visual_description": "...",
  "key_action": "...",
  "dialog": "...",
  "audio": "...",
  "exit_state": "...",
  "transition": {{ "type": "cut|fade|dissolve|wipe", "to_scene": number }},
  "negative_prompt": "..." (optional)
}}

META (include once; if not included, it's fine; the server has defaults):
{{
  "prompt_meta": {meta_block}
}}

{story_details} (context, do not echo back outside JSON)
Return ONLY the JSON."#;

/// Metadata prefilled from the request, repeated in every continuation chunk.
const META_BLOCK: &str = r#"{{
    "title": "{title_long}",
    "genre": "{genre}",
    "target_audience": "{target_audience}",
    "age_group": "{age_group} years old",
    "core_value": "{core_value}",
    "language": "{language}",
    "total_duration": "{total_duration}",
    "total_scenes": {total},
    "creation_date": "{creation_date}",
    "animation_style": "{animation_style}",
    "technical": {{ "aspect_ratio": "16:9", "fps": 30, "resolution": "3840x2160" }},
    "negative_prompt": "{negative_prompt}",
    "final_instruction": "{final_instruction}"
  }}"#;

/// Metadata skeleton for a single-call outline; the model names the story.
const FULL_META_BLOCK: &str = r#"{{
    "title": "string",
    "genre": "string",
    "target_audience": "{target_audience}",
    "age_group": "{age_group} years old",
    "core_value": "string",
    "language": "{language}",
    "total_duration": "{total_duration}",
    "total_scenes": {total},
    "creation_date": "{creation_date}",
    "animation_style": "{animation_style}",
    "technical": {{ "aspect_ratio": "16:9", "fps": 30, "resolution": "3840x2160" }},
    "negative_prompt": "{negative_prompt}",
    "final_instruction": "{final_instruction}"
  }}"#;

const STRUCTURED_DETAILS: &str = "Story Details:
- Title: {title_short}
- Genre: {genre}
- Age Group: {age_group}
- Plot Idea: {idea}
- Characters: {characters}
- Core Value/Moral: {moral}";

const PLAIN_FULL: &str = r#"Based on the following story details, generate a multi-scene story outline.
Generate a valid JSON array with exactly {count} scene objects.
CRITICAL INSTRUCTIONS FOR LANGUAGE:
1. All string values for keys "beat", "visual", "aksi", "audio", "exit", and "transisi" MUST be in {scene_language}.
2. The string value for the "dialog" key MUST be in {dialogue_language}. If no dialogue is needed, the value must be an empty string.

Each object in the array MUST follow this exact structure (exact keys):
{{ "beat": "string", "visual": "string", "aksi": "string", "dialog": "string", "audio": "string", "exit": "string", "transisi": "string" }}.

{plain_details}
Return ONLY the JSON array."#;

const PLAIN_CHUNK: &str = r#"Based on the following story details, generate a valid JSON array with EXACTLY {count} scene objects.
These are scenes {first}..{last} (inclusive) of a {total}-scene story; continue the plot from scene {first} and keep it consistent with the full story.
CRITICAL LANGUAGE:
- All values for keys "beat", "visual", "aksi", "audio", "exit", and "transisi" MUST be in {scene_language}.
- The value for key "dialog" MUST be in {dialogue_language}. If no dialogue, use empty string.
STRUCTURE per item (exact keys): {{ "beat": "string", "visual": "string", "aksi": "string", "dialog": "string", "audio": "string", "exit": "string", "transisi": "string" }}.
Do NOT include markdown fences or explanations.
{plain_details}
Return ONLY the JSON array."#;

const PLAIN_DETAILS: &str = "Story Details:
- Genre: {genre}
- Target Audience: {age_group} years old
- Plot Idea: {idea}
- Characters: {characters}
- Moral Lesson: {moral}";

/// Build the outline instruction for `request`.
///
/// With a `window`, the prompt asks only for that absolute scene range.
/// `creation_date` is `YYYY-MM-DD` and is echoed into the metadata template.
pub fn build_outline_prompt(
    request: &GenerationRequest,
    window: Option<ChunkWindow>,
    creation_date: &str,
) -> String {
    let window = window.unwrap_or(ChunkWindow {
        offset: 0,
        count: request.scene_count,
        total: request.scene_count,
    });
    let total = window.total;

    let mut vars = story_vars(
        &request.genre,
        &request.age_group,
        &request.idea,
        &request.characters,
        &request.moral,
        NOT_SPECIFIED_CREATIVE,
    )
    .insert("count", window.count.to_string())
    .insert("total", total.to_string())
    .insert("first", window.first_scene().to_string())
    .insert("last", window.last_scene().to_string())
    .insert("timecode_start", (window.offset * SCENE_SECONDS).to_string())
    .insert(
        "timecode_end",
        ((window.offset + 1) * SCENE_SECONDS).to_string(),
    )
    .insert("scene_seconds", SCENE_SECONDS.to_string())
    .insert("scene_language", request.output_mode.scene_language())
    .insert("dialogue_language", dialogue_language(&request.dialog_language))
    .insert("language", request.dialog_language.clone())
    .insert("core_value", request.moral.clone())
    .insert("title_short", short_title(&request.idea))
    .insert("title_long", title_from_idea(&request.idea))
    .insert("target_audience", TARGET_AUDIENCE)
    .insert(
        "total_duration",
        format_duration_id(u64::from(total) * u64::from(SCENE_SECONDS)),
    )
    .insert("creation_date", creation_date)
    .insert("animation_style", DEFAULT_ANIMATION_STYLE)
    .insert("negative_prompt", DEFAULT_NEGATIVE_PROMPT)
    .insert("final_instruction", DEFAULT_FINAL_INSTRUCTION);

    let chunked = window.count < total;
    if request.output_mode.is_structured() {
        let meta_block = render(if chunked { META_BLOCK } else { FULL_META_BLOCK }, &vars);
        let story_details = render(STRUCTURED_DETAILS, &vars);
        vars = vars
            .insert("meta_block", meta_block)
            .insert("story_details", story_details);
        render(if chunked { STRUCTURED_CHUNK } else { STRUCTURED_FULL }, &vars)
    } else {
        let plain_details = render(PLAIN_DETAILS, &vars);
        vars = vars.insert("plain_details", plain_details);
        render(if chunked { PLAIN_CHUNK } else { PLAIN_FULL }, &vars)
    }
}

/// Story fields shared by the analyze and script tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryBrief {
    pub genre: String,
    pub age_group: String,
    pub idea: String,
    pub characters: String,
    pub moral: String,
}

const DEVELOP_TEMPLATE: &str = r#"Berdasarkan ide cerita anak berikut: "{idea}", kembangkan menjadi JSON dengan keys: plot (string, 1 paragraf singkat), characters (string, 1 kalimat), moral (string, 1 kalimat). Kembalikan HANYA JSON."#;

const ANALYZE_TEMPLATE: &str = "You are a professional script consultant specializing in children's animated content for platforms like YouTube. Analyze the provided story idea based on key feasibility metrics. Provide a concise, constructive, and encouraging analysis.

CRITICAL INSTRUCTIONS:
1. Output Format: Your response MUST be a single, valid JSON object. Do not include any text or markdown before or after it.
2. Language: The analysis text within the JSON MUST be in Indonesian.

JSON KEYS (schema):
- overall_score: number (1-10)
- summary: string (ringkasan 1 kalimat)
- strengths: string[]
- weaknesses: string[]
- recommendations: string[]

Story Details:
- Genre: {genre}
- Target Audience: {age_group} years old
- Plot Idea: {idea}
- Characters: {characters}
- Moral Lesson: {moral}

Analyze the idea and provide your feedback in the specified JSON structure.";

const SCRIPT_TEMPLATE: &str = "Buatkan naskah video storytelling anak bergaya Pixar berdasarkan ide berikut.
**Ide Pokok:** {idea}
**Karakter Utama:** {characters}
**Pesan Moral:** {moral}
Genre: {genre}. Target usia: {age_group} tahun.
Gunakan format multi-scene. Setiap scene tulis dengan:
SCENE NUMBER, TITLE, DURATION (6–10 detik), CORE SCENE DESCRIPTION, CINEMATOGRAPHY, LIGHTING & COLOR, SOUND & AMBIENCE, TRANSITION TO NEXT SCENE.
Berhenti saat cerita selesai. Bahasa Indonesia naratif lembut.";

/// Ask for `{plot, characters, moral}` developed from a one-line idea.
pub fn build_develop_prompt(idea: &str) -> String {
    render(DEVELOP_TEMPLATE, &PromptVars::new().insert("idea", idea))
}

/// Ask for a feasibility review of the story as a JSON object.
pub fn build_analyze_prompt(brief: &StoryBrief) -> String {
    render(ANALYZE_TEMPLATE, &brief_vars(brief, "Not specified."))
}

/// Ask for a free-text multi-scene script.
pub fn build_script_prompt(brief: &StoryBrief) -> String {
    render(
        SCRIPT_TEMPLATE,
        &brief_vars(brief, "Tidak ditentukan, biarkan AI berkreasi."),
    )
}

fn brief_vars(brief: &StoryBrief, missing: &str) -> PromptVars {
    story_vars(
        &brief.genre,
        &brief.age_group,
        &brief.idea,
        &brief.characters,
        &brief.moral,
        missing,
    )
}

fn story_vars(
    genre: &str,
    age_group: &str,
    idea: &str,
    characters: &str,
    moral: &str,
    missing: &str,
) -> PromptVars {
    let or_missing = |s: &str| {
        if s.trim().is_empty() {
            missing.to_string()
        } else {
            s.to_string()
        }
    };
    PromptVars::new()
        .insert("genre", genre)
        .insert("age_group", age_group)
        .insert("idea", idea)
        .insert("characters", or_missing(characters))
        .insert("moral", or_missing(moral))
}

fn short_title(idea: &str) -> String {
    let idea = idea.trim();
    if idea.is_empty() {
        "Untitled".to_string()
    } else {
        idea.chars().take(50).collect()
    }
}
