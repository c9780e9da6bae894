//! Result merging: accumulated drafts in, one [`GenerationResult`] out.

use crate::metadata::GenerationMetadata;
use crate::scene::SceneDraft;
use crate::types::{GenerationRequest, GenerationResult};
use serde_json::Value;

/// Merge chunk drafts (in chunk order) into the final outline.
///
/// Keeps at most `request.scene_count` drafts, renumbers and retimes them,
/// and builds the metadata block from `meta` (the first block any chunk
/// supplied) or from the request when none was supplied. Totals are always
/// derived from the merged length.
pub fn merge(
    drafts: Vec<SceneDraft>,
    meta: Option<&Value>,
    request: &GenerationRequest,
    creation_date: &str,
) -> GenerationResult {
    let wanted = request.scene_count as usize;
    if drafts.len() > wanted {
        tracing::debug!(
            received = drafts.len(),
            kept = wanted,
            "dropping surplus scenes"
        );
    }

    let kept = drafts.len().min(wanted);
    let scenes: Vec<_> = drafts
        .iter()
        .take(kept)
        .enumerate()
        .map(|(i, draft)| draft.normalize(i, kept))
        .collect();

    let count = scenes.len() as u32;
    let metadata = match meta {
        Some(upstream) => GenerationMetadata::from_upstream(upstream, request, count, creation_date),
        None => GenerationMetadata::synthesize(request, count, creation_date),
    };

    GenerationResult::new(scenes, metadata)
}
