//! Scene drafts as the model returns them, and the normalized scene.
//!
//! Drafts are loosely shaped: the model is asked for exact keys but may use
//! the other mode's names, numbers where strings belong, or drop fields.
//! Each [`SceneDraft`] variant carries its own key table and one coercion,
//! [`SceneDraft::normalize`], produces the fixed [`NormalizedScene`] shape.

use crate::types::{OutputMode, SCENE_SECONDS};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Transition type used when the draft gives none.
pub const DEFAULT_TRANSITION: &str = "cut";

/// Key names to try for each normalized field, in priority order.
struct DraftKeys {
    beat: &'static [&'static str],
    visual: &'static [&'static str],
    action: &'static [&'static str],
    dialog: &'static [&'static str],
    audio: &'static [&'static str],
    exit: &'static [&'static str],
    transition: &'static [&'static str],
    negative: &'static [&'static str],
}

const STRUCTURED_KEYS: DraftKeys = DraftKeys {
    beat: &["beat_goal", "beat"],
    visual: &["visual_description", "visual"],
    action: &["key_action", "aksi"],
    dialog: &["dialog"],
    audio: &["audio"],
    exit: &["exit_state", "exit"],
    transition: &["transition"],
    negative: &["negative_prompt"],
};

const PLAIN_KEYS: DraftKeys = DraftKeys {
    beat: &["beat", "beat_goal"],
    visual: &["visual", "visual_description"],
    action: &["aksi", "key_action"],
    dialog: &["dialog"],
    audio: &["audio"],
    exit: &["exit", "exit_state"],
    transition: &["transisi", "transition"],
    negative: &["negative_prompt"],
};

/// One scene as returned by the completion service.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneDraft {
    /// `{beat_goal, visual_description, key_action, dialog, audio, exit_state, transition{type,to_scene}, negative_prompt?}`
    Structured(Map<String, Value>),
    /// `{beat, visual, aksi, dialog, audio, exit, transisi}`
    Plain(Map<String, Value>),
}

impl SceneDraft {
    /// Wrap a raw array element. Non-objects become empty drafts.
    pub fn from_value(mode: OutputMode, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if mode.is_structured() {
            SceneDraft::Structured(fields)
        } else {
            SceneDraft::Plain(fields)
        }
    }

    fn fields(&self) -> &Map<String, Value> {
        match self {
            SceneDraft::Structured(f) | SceneDraft::Plain(f) => f,
        }
    }

    fn keys(&self) -> &'static DraftKeys {
        match self {
            SceneDraft::Structured(_) => &STRUCTURED_KEYS,
            SceneDraft::Plain(_) => &PLAIN_KEYS,
        }
    }

    /// Produce the scene at 0-based `index` of a `total`-scene outline.
    ///
    /// Any number or timecode the draft proposes is discarded.
    pub fn normalize(&self, index: usize, total: usize) -> NormalizedScene {
        let fields = self.fields();
        let keys = self.keys();
        let number = index as u32 + 1;
        let default_target = if index + 1 < total { number + 1 } else { number };

        let (kind, target) = coalesce_transition(fields, keys.transition);
        let to_scene = target
            .filter(|t| (1..=total as u64).contains(t))
            .map(|t| t as u32)
            .unwrap_or(default_target);

        NormalizedScene {
            scene_number: number,
            timecode: Timecode::for_index(index as u32),
            duration: format!("{SCENE_SECONDS} detik"),
            beat_goal: coalesce_text(fields, keys.beat),
            visual_description: coalesce_text(fields, keys.visual),
            key_action: coalesce_text(fields, keys.action),
            dialog: coalesce_text(fields, keys.dialog),
            audio: coalesce_text(fields, keys.audio),
            exit_state: coalesce_text(fields, keys.exit),
            transition: Transition {
                kind: kind.unwrap_or_else(|| DEFAULT_TRANSITION.to_string()),
                to_scene,
            },
            negative_prompt: Some(coalesce_text(fields, keys.negative)).filter(|s| !s.is_empty()),
        }
    }
}

/// Locate the scene array in a parsed reply.
///
/// Accepts `scenes`, `Scenes`, `data.scenes`, or a bare top-level array.
pub fn extract_scenes(value: &Value) -> Option<&[Value]> {
    if let Value::Array(items) = value {
        return Some(items);
    }
    let object = value.as_object()?;
    ["scenes", "Scenes"]
        .iter()
        .filter_map(|k| object.get(*k))
        .chain(object.get("data").and_then(|d| d.get("scenes")))
        .find_map(|v| v.as_array())
        .map(Vec::as_slice)
}

/// Coerce a JSON value to text the way a loose client would.
///
/// Empty strings, `null`, `false` and `0` count as absent.
pub(crate) fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// First non-empty text among `keys`, or an empty string.
fn coalesce_text(fields: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| fields.get(*k))
        .find_map(text_of)
        .unwrap_or_default()
}

/// A positive whole number, from a JSON number only.
fn scene_number_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && *f > 0.0)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}

/// Transition type and target from an object (`{type, to_scene}`) or a bare
/// description string.
fn coalesce_transition(fields: &Map<String, Value>, keys: &[&str]) -> (Option<String>, Option<u64>) {
    for key in keys {
        match fields.get(*key) {
            Some(Value::Object(t)) => {
                let kind = t.get("type").and_then(text_of);
                let target = t.get("to_scene").and_then(scene_number_of);
                return (kind, target);
            }
            Some(value @ Value::String(_)) => {
                if let Some(kind) = text_of(value) {
                    return (Some(kind), None);
                }
            }
            _ => {}
        }
    }
    (None, None)
}

/// `[start, end)` in seconds, rendered as `"0s–8s"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    pub start_secs: u32,
    pub end_secs: u32,
}

impl Timecode {
    /// Window of the scene at 0-based `index`.
    pub fn for_index(index: u32) -> Self {
        Self {
            start_secs: index * SCENE_SECONDS,
            end_secs: (index + 1) * SCENE_SECONDS,
        }
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s–{}s", self.start_secs, self.end_secs)
    }
}

impl Serialize for Timecode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    #[serde(rename = "type")]
    pub kind: String,
    pub to_scene: u32,
}

/// A merged, renumbered scene with a fixed field set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedScene {
    pub scene_number: u32,
    pub timecode: Timecode,
    pub duration: String,
    pub beat_goal: String,
    pub visual_description: String,
    pub key_action: String,
    pub dialog: String,
    pub audio: String,
    pub exit_state: String,
    pub transition: Transition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(v: Value) -> SceneDraft {
        SceneDraft::from_value(OutputMode::Structured, v)
    }

    fn plain(v: Value) -> SceneDraft {
        SceneDraft::from_value(OutputMode::PlainLocal, v)
    }

    #[test]
    fn test_structured_fields() {
        let draft = structured(json!({
            "scene_number": 42,
            "timecode": "999s–1000s",
            "beat_goal": "Kenalan",
            "visual_description": "Hutan cerah",
            "key_action": "Kelinci melompat",
            "dialog": "Halo!",
            "audio": "Burung berkicau",
            "exit_state": "Kelinci tersenyum",
            "transition": { "type": "fade", "to_scene": 2 },
            "negative_prompt": "no text"
        }));
        let scene = draft.normalize(0, 3);
        assert_eq!(scene.scene_number, 1);
        assert_eq!(scene.timecode, Timecode { start_secs: 0, end_secs: 8 });
        assert_eq!(scene.beat_goal, "Kenalan");
        assert_eq!(scene.key_action, "Kelinci melompat");
        assert_eq!(scene.exit_state, "Kelinci tersenyum");
        assert_eq!(scene.transition.kind, "fade");
        assert_eq!(scene.transition.to_scene, 2);
        assert_eq!(scene.negative_prompt.as_deref(), Some("no text"));
    }

    #[test]
    fn test_plain_fields_and_aliases() {
        let draft = plain(json!({
            "beat": "Berbagi",
            "visual": "Taman",
            "aksi": "Memberi wortel",
            "dialog": "Ini untukmu",
            "audio": "Musik lembut",
            "exit": "Teman senang",
            "transisi": "dissolve"
        }));
        let scene = draft.normalize(1, 3);
        assert_eq!(scene.scene_number, 2);
        assert_eq!(scene.beat_goal, "Berbagi");
        assert_eq!(scene.visual_description, "Taman");
        assert_eq!(scene.key_action, "Memberi wortel");
        assert_eq!(scene.exit_state, "Teman senang");
        assert_eq!(scene.transition.kind, "dissolve");
        assert_eq!(scene.transition.to_scene, 3);
        assert!(scene.negative_prompt.is_none());
    }

    #[test]
    fn test_structured_falls_back_to_plain_names() {
        let scene = structured(json!({ "beat": "b", "visual": "v", "aksi": "a", "exit": "e" }))
            .normalize(0, 1);
        assert_eq!(scene.beat_goal, "b");
        assert_eq!(scene.visual_description, "v");
        assert_eq!(scene.key_action, "a");
        assert_eq!(scene.exit_state, "e");
    }

    #[test]
    fn test_empty_primary_uses_alias() {
        let scene = structured(json!({ "beat_goal": "", "beat": "fallback" })).normalize(0, 1);
        assert_eq!(scene.beat_goal, "fallback");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let scene = structured(json!("not an object")).normalize(2, 3);
        assert_eq!(scene.beat_goal, "");
        assert_eq!(scene.dialog, "");
        assert_eq!(scene.transition.kind, DEFAULT_TRANSITION);
        assert_eq!(scene.transition.to_scene, 3); // last scene points at itself
    }

    #[test]
    fn test_non_string_values_coerced() {
        let scene = structured(json!({ "dialog": 7, "audio": null, "beat_goal": true }))
            .normalize(0, 2);
        assert_eq!(scene.dialog, "7");
        assert_eq!(scene.audio, "");
        assert_eq!(scene.beat_goal, "true");
    }

    #[test]
    fn test_unusable_transition_target_replaced() {
        let out_of_range = structured(json!({ "transition": { "type": "wipe", "to_scene": 40 } }))
            .normalize(0, 5);
        assert_eq!(out_of_range.transition.kind, "wipe");
        assert_eq!(out_of_range.transition.to_scene, 2);

        let stringly = structured(json!({ "transition": { "to_scene": "3" } })).normalize(0, 5);
        assert_eq!(stringly.transition.kind, "cut");
        assert_eq!(stringly.transition.to_scene, 2);

        let float = structured(json!({ "transition": { "to_scene": 4.0 } })).normalize(0, 5);
        assert_eq!(float.transition.to_scene, 4);
    }

    #[test]
    fn test_extract_scenes_locations() {
        let one = json!([{ "beat": "a" }]);
        assert_eq!(extract_scenes(&one).map(<[_]>::len), Some(1));
        assert_eq!(extract_scenes(&json!({ "scenes": [1, 2] })).map(<[_]>::len), Some(2));
        assert_eq!(extract_scenes(&json!({ "Scenes": [1] })).map(<[_]>::len), Some(1));
        assert_eq!(
            extract_scenes(&json!({ "data": { "scenes": [1, 2, 3] } })).map(<[_]>::len),
            Some(3)
        );
        assert!(extract_scenes(&json!({ "scenes": "nope" })).is_none());
        assert!(extract_scenes(&json!({ "prompt_meta": {} })).is_none());
        assert!(extract_scenes(&json!("text")).is_none());
    }

    #[test]
    fn test_timecode_serializes_as_label() {
        let scene = plain(json!({})).normalize(2, 3);
        let value = serde_json::to_value(&scene).unwrap();
        assert_eq!(value["timecode"], "16s–24s");
        assert_eq!(value["duration"], "8 detik");
        assert_eq!(value["transition"]["type"], "cut");
        assert!(value.get("negative_prompt").is_none());
    }
}
