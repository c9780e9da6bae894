//! The batch-level metadata block (`prompt_meta`).
//!
//! Either synthesized from the request or coerced from whatever the model
//! supplied. `total_scenes` and `total_duration` are always recomputed from
//! the merged scene count by [`GenerationMetadata::set_totals`].

use crate::scene::text_of;
use crate::types::{GenerationRequest, SCENE_SECONDS};
use serde::Serialize;
use serde_json::{Map, Value};

pub const DEFAULT_ANIMATION_STYLE: &str = "3D Pixar-like, child-friendly, expressive faces";

pub const DEFAULT_NEGATIVE_PROMPT: &str = "realistic gore, violence, blood, sharp teeth close-up, horror vibes, dark/gritty tone, excessive motion blur, shaky cam, text overlays, watermark, subtitles burned-in, brand logos, complex crowd scenes, night-time lighting, scary sound effects, blurry, distorted, watermark, subtitle, captions, unreadable letters, unclear letters, broken letters, messy letters, ugly, duplicate, morbid, mutilated, out of frame, poorly drawn, mutation, deformed, bad anatomy, bad proportions, extra limbs, cloned face, disfigured, visible hair under hijab, incomplete hijab";

pub const DEFAULT_FINAL_INSTRUCTION: &str = "Render all scenes in consistent 3D Pixar-like style with soft lighting and warm colors. Keep each scene ~8 seconds. Ensure child-safe content, readable compositions, smooth camera moves (no shaky cam), and gentle transitions. Maintain character continuity and props across scenes. No on-screen text unless specified in dialog; keep faces expressive and friendly.";

pub const TARGET_AUDIENCE: &str = "Children";

const TITLE_MAX_CHARS: usize = 80;

/// Keys that name the metadata block in a reply, in priority order.
const META_KEYS: &[&str] = &["prompt_meta", "meta", "promptMeta"];

/// Fields with a typed slot in [`GenerationMetadata`].
const KNOWN_FIELDS: &[&str] = &[
    "title",
    "genre",
    "target_audience",
    "age_group",
    "core_value",
    "language",
    "total_duration",
    "total_scenes",
    "creation_date",
    "animation_style",
    "technical",
    "negative_prompt",
    "final_instruction",
];

/// Render profile of the final video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnicalProfile {
    pub aspect_ratio: String,
    pub fps: u32,
    pub resolution: String,
}

impl Default for TechnicalProfile {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_string(),
            fps: 30,
            resolution: "3840x2160".to_string(),
        }
    }
}

impl TechnicalProfile {
    fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(obj) = value.as_object() else {
            return defaults;
        };
        Self {
            aspect_ratio: obj
                .get("aspect_ratio")
                .and_then(text_of)
                .unwrap_or(defaults.aspect_ratio),
            fps: obj
                .get("fps")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.fps),
            resolution: obj
                .get("resolution")
                .and_then(text_of)
                .unwrap_or(defaults.resolution),
        }
    }
}

/// Summary of the whole generated batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationMetadata {
    pub title: String,
    pub genre: String,
    pub target_audience: String,
    pub age_group: String,
    pub core_value: String,
    pub language: String,
    pub total_duration: String,
    pub total_scenes: u32,
    pub creation_date: String,
    pub animation_style: String,
    pub technical: TechnicalProfile,
    pub negative_prompt: String,
    pub final_instruction: String,
    /// Keys the model added beyond the known set, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GenerationMetadata {
    /// Build the default block for `request` with `scene_count` scenes.
    ///
    /// `creation_date` is `YYYY-MM-DD`.
    pub fn synthesize(request: &GenerationRequest, scene_count: u32, creation_date: &str) -> Self {
        let mut meta = Self {
            title: title_from_idea(&request.idea),
            genre: request.genre.clone(),
            target_audience: TARGET_AUDIENCE.to_string(),
            age_group: format!("{} years old", request.age_group),
            core_value: request.moral.clone(),
            language: request.dialog_language.clone(),
            total_duration: String::new(),
            total_scenes: 0,
            creation_date: creation_date.to_string(),
            animation_style: DEFAULT_ANIMATION_STYLE.to_string(),
            technical: TechnicalProfile::default(),
            negative_prompt: DEFAULT_NEGATIVE_PROMPT.to_string(),
            final_instruction: DEFAULT_FINAL_INSTRUCTION.to_string(),
            extra: Map::new(),
        };
        meta.set_totals(scene_count);
        meta
    }

    /// Coerce a block supplied by the model.
    ///
    /// Each known field is taken when it holds usable text, otherwise the
    /// synthesized default fills it. Unknown keys land in `extra`.
    pub fn from_upstream(
        upstream: &Value,
        request: &GenerationRequest,
        scene_count: u32,
        creation_date: &str,
    ) -> Self {
        let mut meta = Self::synthesize(request, scene_count, creation_date);
        let Some(obj) = upstream.as_object() else {
            return meta;
        };

        let text_fields: [(&str, &mut String); 10] = [
            ("title", &mut meta.title),
            ("genre", &mut meta.genre),
            ("target_audience", &mut meta.target_audience),
            ("age_group", &mut meta.age_group),
            ("core_value", &mut meta.core_value),
            ("language", &mut meta.language),
            ("creation_date", &mut meta.creation_date),
            ("animation_style", &mut meta.animation_style),
            ("negative_prompt", &mut meta.negative_prompt),
            ("final_instruction", &mut meta.final_instruction),
        ];
        for (key, slot) in text_fields {
            if let Some(text) = obj.get(key).and_then(text_of) {
                *slot = text;
            }
        }
        if let Some(technical) = obj.get("technical") {
            meta.technical = TechnicalProfile::from_value(technical);
        }
        meta.extra = obj
            .iter()
            .filter(|(k, _)| !KNOWN_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        meta
    }

    /// Overwrite the totals with values derived from `scene_count`.
    pub fn set_totals(&mut self, scene_count: u32) {
        self.total_scenes = scene_count;
        self.total_duration = format_duration_id(u64::from(scene_count) * u64::from(SCENE_SECONDS));
    }
}

/// Find the metadata block in a parsed reply. Only objects count.
pub fn extract_meta(value: &Value) -> Option<&Value> {
    let obj = value.as_object()?;
    META_KEYS
        .iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| v.is_object())
}

/// Title derived from the story idea: first 80 characters, or `Untitled`.
pub fn title_from_idea(idea: &str) -> String {
    let idea = idea.trim();
    if idea.is_empty() {
        "Untitled".to_string()
    } else {
        idea.chars().take(TITLE_MAX_CHARS).collect()
    }
}

/// Indonesian duration label: `"1 jam 2 menit"`, `"3 menit 20 detik"`.
///
/// Seconds are dropped once the duration reaches an hour; zero is `"0 detik"`.
///
/// ```
/// use classtoon::metadata::format_duration_id;
///
/// assert_eq!(format_duration_id(120), "2 menit");
/// assert_eq!(format_duration_id(3725), "1 jam 2 menit");
/// ```
pub fn format_duration_id(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{hours} jam"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} menit"));
    }
    if seconds > 0 && hours == 0 {
        parts.push(format!("{seconds} detik"));
    }
    if parts.is_empty() {
        return "0 detik".to_string();
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> GenerationRequest {
        GenerationRequest {
            idea: "Kelinci belajar berbagi".into(),
            moral: "Berbagi itu indah".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_format_duration_id() {
        assert_eq!(format_duration_id(0), "0 detik");
        assert_eq!(format_duration_id(8), "8 detik");
        assert_eq!(format_duration_id(64), "1 menit 4 detik");
        assert_eq!(format_duration_id(120), "2 menit");
        assert_eq!(format_duration_id(3600), "1 jam");
        assert_eq!(format_duration_id(3608), "1 jam");
        assert_eq!(format_duration_id(3725), "1 jam 2 menit");
    }

    #[test]
    fn test_synthesize_defaults() {
        let meta = GenerationMetadata::synthesize(&request(), 15, "2026-10-18");
        assert_eq!(meta.title, "Kelinci belajar berbagi");
        assert_eq!(meta.genre, "Dongeng");
        assert_eq!(meta.target_audience, "Children");
        assert_eq!(meta.age_group, "4-6 years old");
        assert_eq!(meta.core_value, "Berbagi itu indah");
        assert_eq!(meta.language, "ID");
        assert_eq!(meta.total_scenes, 15);
        assert_eq!(meta.total_duration, "2 menit");
        assert_eq!(meta.creation_date, "2026-10-18");
        assert_eq!(meta.technical, TechnicalProfile::default());
        assert_eq!(meta.negative_prompt, DEFAULT_NEGATIVE_PROMPT);
    }

    #[test]
    fn test_title_truncated_by_chars() {
        let long = "é".repeat(100);
        assert_eq!(title_from_idea(&long).chars().count(), 80);
        assert_eq!(title_from_idea("   "), "Untitled");
    }

    #[test]
    fn test_from_upstream_keeps_values_recomputes_totals() {
        let upstream = json!({
            "title": "Kelinci Baik Hati",
            "total_scenes": 40,
            "total_duration": "banyak",
            "technical": { "aspect_ratio": "9:16", "fps": "sixty" },
            "mood": "ceria"
        });
        let meta = GenerationMetadata::from_upstream(&upstream, &request(), 3, "2026-10-18");
        assert_eq!(meta.title, "Kelinci Baik Hati");
        assert_eq!(meta.total_scenes, 3);
        assert_eq!(meta.total_duration, "24 detik");
        assert_eq!(meta.technical.aspect_ratio, "9:16");
        assert_eq!(meta.technical.fps, 30);
        assert_eq!(meta.animation_style, DEFAULT_ANIMATION_STYLE);
        assert_eq!(meta.extra.get("mood"), Some(&json!("ceria")));

        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["mood"], "ceria");
        assert_eq!(value["total_scenes"], 3);
    }

    #[test]
    fn test_extract_meta_priority() {
        let both = json!({ "meta": { "title": "b" }, "prompt_meta": { "title": "a" } });
        assert_eq!(extract_meta(&both).unwrap()["title"], "a");

        let camel = json!({ "promptMeta": { "title": "c" } });
        assert_eq!(extract_meta(&camel).unwrap()["title"], "c");

        assert!(extract_meta(&json!({ "prompt_meta": "text" })).is_none());
        assert!(extract_meta(&json!([1, 2])).is_none());
    }
}
