//! Chunk scheduler: the outline generation pipeline.
//!
//! ```text
//! GenerationRequest
//!   └─ for each window (≤ 10 scenes, strictly sequential)
//!        build_outline_prompt ─► retry_with_backoff(
//!            complete_with_deadline ─► parse_loose ─► extract_scenes )
//!   └─ merge ─► GenerationResult
//! ```
//!
//! Each window owns a fresh retry budget. The first window that exhausts it
//! aborts the whole run with that window's last error; nothing partial is
//! returned.

use crate::backend::{complete_with_deadline, LlmRequest};
use crate::error::Result;
use crate::events::Event;
use crate::exec_ctx::ExecCtx;
use crate::merge::merge;
use crate::metadata::extract_meta;
use crate::parsing::parse_loose;
use crate::prompt::build_outline_prompt;
use crate::retry::retry_with_backoff;
use crate::scene::{extract_scenes, SceneDraft};
use crate::types::{ChunkWindow, GenerationRequest, GenerationResult, CHUNK_SIZE};
use crate::GenerationError;
use serde_json::Value;

/// Generate an outline, stamping today's UTC date into the metadata.
pub async fn generate_outline(
    ctx: &ExecCtx,
    request: &GenerationRequest,
) -> Result<GenerationResult> {
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    generate_outline_dated(ctx, request, &today).await
}

/// Generate an outline with an explicit `YYYY-MM-DD` creation date.
pub async fn generate_outline_dated(
    ctx: &ExecCtx,
    request: &GenerationRequest,
    creation_date: &str,
) -> Result<GenerationResult> {
    request.validate()?;

    let chunked = request.is_chunked();
    let windows = if chunked {
        ChunkWindow::plan(request.scene_count, CHUNK_SIZE)
    } else {
        vec![ChunkWindow {
            offset: 0,
            count: request.scene_count,
            total: request.scene_count,
        }]
    };

    let model = request.effective_model();
    let config = request.output_mode.llm_config();
    tracing::info!(
        model,
        scenes = request.scene_count,
        chunks = windows.len(),
        mode = ?request.output_mode,
        "generating outline"
    );

    let mut drafts: Vec<SceneDraft> = Vec::with_capacity(request.scene_count as usize);
    let mut meta: Option<Value> = None;

    for (index, window) in windows.iter().enumerate() {
        ctx.emit(Event::ChunkStart {
            index,
            offset: window.offset,
            count: window.count,
        });

        let prompt = build_outline_prompt(request, chunked.then_some(*window), creation_date);
        let llm_request = LlmRequest::new(model, prompt, config.clone());

        let (parsed, attempts) = match run_chunk(ctx, index, &llm_request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(chunk = index, error = %err, "chunk failed, aborting generation");
                ctx.emit(Event::GenerationEnd {
                    ok: false,
                    scenes: 0,
                });
                return Err(err);
            }
        };

        if let Some(found) = extract_meta(&parsed) {
            if meta.is_none() {
                meta = Some(found.clone());
            } else {
                // First block wins, even when a later one differs.
                tracing::debug!(chunk = index, "ignoring metadata block from later chunk");
            }
        }

        let items = extract_scenes(&parsed).unwrap_or_default();
        tracing::debug!(
            chunk = index,
            offset = window.offset,
            requested = window.count,
            received = items.len(),
            attempts,
            "chunk complete"
        );
        ctx.emit(Event::ChunkEnd {
            index,
            scenes: items.len(),
            attempts,
        });
        drafts.extend(
            items
                .iter()
                .map(|item| SceneDraft::from_value(request.output_mode, item.clone())),
        );
    }

    let result = merge(drafts, meta.as_ref(), request, creation_date);
    tracing::info!(scenes = result.scenes().len(), "outline generated");
    ctx.emit(Event::GenerationEnd {
        ok: true,
        scenes: result.scenes().len(),
    });
    Ok(result)
}

/// One window: call, parse, require a scene array. Retried as a unit.
///
/// Returns the parsed reply and the attempt that produced it.
async fn run_chunk(
    ctx: &ExecCtx,
    index: usize,
    request: &LlmRequest,
) -> Result<(Value, u32)> {
    let name = format!("outline chunk {}", index + 1);
    let mut on_retry = |attempt, delay, err: &GenerationError| {
        ctx.report_retry(&name, attempt, delay, err)
    };

    retry_with_backoff(&ctx.backoff, &mut on_retry, move |attempt| async move {
        let response = complete_with_deadline(&ctx.backend, request).await?;
        let parsed = parse_loose(&response.text)?;
        if extract_scenes(&parsed).is_none() {
            return Err(GenerationError::ShapeMismatch {
                expected: "a scene array",
                raw: response.text,
            });
        }
        Ok((parsed, attempt))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackoffConfig, MockBackend, MockReply};
    use crate::events::FnEventHandler;
    use crate::types::{OutputMode, STRUCTURED_OUTLINE_MODEL};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    const DATE: &str = "2026-10-18";

    fn plain_scenes(n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| {
                    json!({
                        "beat": format!("beat {i}"),
                        "visual": "hutan",
                        "aksi": "melompat",
                        "dialog": "",
                        "audio": "angin",
                        "exit": "tersenyum",
                        "transisi": "cut"
                    })
                })
                .collect(),
        )
    }

    fn structured_reply(n: usize, title: Option<&str>) -> String {
        let scenes: Vec<Value> = (0..n)
            .map(|i| {
                json!({
                    "scene_number": 1,
                    "timecode": "0s–8s",
                    "beat_goal": format!("goal {i}"),
                    "transition": { "type": "fade", "to_scene": 1 }
                })
            })
            .collect();
        match title {
            Some(t) => json!({ "prompt_meta": { "title": t }, "scenes": scenes }).to_string(),
            None => json!({ "scenes": scenes }).to_string(),
        }
    }

    fn ctx_with(mock: Arc<MockBackend>) -> ExecCtx {
        ExecCtx::builder(mock).backoff(BackoffConfig::standard()).build()
    }

    fn request(mode: OutputMode, scenes: u32) -> GenerationRequest {
        GenerationRequest {
            output_mode: mode,
            scene_count: scenes,
            idea: "kelinci belajar berbagi".into(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_plain_request_single_call() {
        let mock = Arc::new(MockBackend::fixed(plain_scenes(3).to_string()));
        let ctx = ctx_with(mock.clone());

        let result = generate_outline_dated(&ctx, &request(OutputMode::PlainLocal, 3), DATE)
            .await
            .unwrap();

        assert_eq!(mock.calls(), 1);
        assert_eq!(result.scenes().len(), 3);
        for (i, scene) in result.scenes().iter().enumerate() {
            assert_eq!(scene.scene_number as usize, i + 1);
            assert_eq!(scene.timecode.start_secs as usize, i * 8);
            assert_eq!(scene.timecode.end_secs as usize, (i + 1) * 8);
        }
        assert_eq!(result.scenes()[0].beat_goal, "beat 0");
        assert_eq!(result.metadata().creation_date, DATE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifteen_structured_scenes_two_chunks() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::text(structured_reply(10, Some("Kelinci"))),
            MockReply::text(structured_reply(5, None)),
        ]));
        let ctx = ctx_with(mock.clone());

        let result = generate_outline_dated(&ctx, &request(OutputMode::Structured, 15), DATE)
            .await
            .unwrap();

        assert_eq!(mock.calls(), 2);
        let prompts = mock.prompts();
        assert!(prompts[0].contains("scene numbers 1..10 (inclusive) of 15 total"));
        assert!(prompts[1].contains("scene numbers 11..15 (inclusive) of 15 total"));
        assert!(mock.models().iter().all(|m| m == STRUCTURED_OUTLINE_MODEL));

        assert_eq!(result.scenes().len(), 15);
        let numbers: Vec<u32> = result.scenes().iter().map(|s| s.scene_number).collect();
        assert_eq!(numbers, (1..=15).collect::<Vec<_>>());
        assert_eq!(result.scenes()[10].beat_goal, "goal 0");
        assert_eq!(result.scenes()[14].timecode.start_secs, 112);
        assert_eq!(result.metadata().title, "Kelinci");
        assert_eq!(result.metadata().total_scenes, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_every_attempt() {
        let mock = Arc::new(MockBackend::new(vec![MockReply::status(429, "quota exceeded")]));
        let ctx = ctx_with(mock.clone());

        let err = generate_outline_dated(&ctx, &request(OutputMode::PlainLocal, 4), DATE)
            .await
            .unwrap_err();

        assert_eq!(mock.calls(), 3);
        assert!(matches!(err, GenerationError::RateLimited { .. }));
        assert_eq!(err.raw_text(), Some("quota exceeded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_text_keeps_raw() {
        let mock = Arc::new(MockBackend::fixed("Maaf, saya tidak bisa membantu."));
        let ctx = ctx_with(mock.clone());

        let err = generate_outline_dated(&ctx, &request(OutputMode::Structured, 5), DATE)
            .await
            .unwrap_err();

        assert_eq!(mock.calls(), 3);
        assert!(matches!(err, GenerationError::Parse { .. }));
        assert_eq!(err.raw_text(), Some("Maaf, saya tidak bisa membantu."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_retried_then_surfaced() {
        let mock = Arc::new(MockBackend::new(vec![MockReply::Empty]));
        let ctx = ctx_with(mock.clone());

        let err = generate_outline_dated(&ctx, &request(OutputMode::PlainLocal, 3), DATE)
            .await
            .unwrap_err();

        assert_eq!(mock.calls(), 3);
        assert!(matches!(err, GenerationError::EmptyResult { .. }));
        assert_eq!(err.raw_text(), Some(r#"{"candidates":[]}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_then_success() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::Empty,
            MockReply::text(plain_scenes(3).to_string()),
        ]));
        let ctx = ctx_with(mock.clone());

        let result = generate_outline_dated(&ctx, &request(OutputMode::PlainLocal, 3), DATE)
            .await
            .unwrap();

        assert_eq!(mock.calls(), 2);
        assert_eq!(result.scenes().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_shape_is_retried() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::text(r#"{"story": "no scenes here"}"#),
            MockReply::text(plain_scenes(2).to_string()),
        ]));
        let retries = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&retries);
        let ctx = ExecCtx::builder(mock.clone())
            .event_handler(Arc::new(FnEventHandler(move |e: Event| {
                if let Event::Retry { delay_ms, .. } = e {
                    sink.lock().unwrap().push(delay_ms);
                }
            })))
            .build();

        let result = generate_outline_dated(&ctx, &request(OutputMode::PlainLocal, 2), DATE)
            .await
            .unwrap();

        assert_eq!(mock.calls(), 2);
        assert_eq!(result.scenes().len(), 2);
        assert_eq!(*retries.lock().unwrap(), vec![600]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_chunk_aborts_batch() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::text(structured_reply(10, None)),
            MockReply::text("garbage"),
            MockReply::text("garbage"),
            MockReply::text("garbage"),
        ]));
        let ctx = ctx_with(mock.clone());

        let err = generate_outline_dated(&ctx, &request(OutputMode::Structured, 25), DATE)
            .await
            .unwrap_err();

        // First chunk once, second chunk its full budget, third never.
        assert_eq!(mock.calls(), 4);
        assert_eq!(err.raw_text(), Some("garbage"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_metadata_wins() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::text(structured_reply(10, None)),
            MockReply::text(structured_reply(10, Some("Kedua"))),
            MockReply::text(structured_reply(2, Some("Ketiga"))),
        ]));
        let ctx = ctx_with(mock.clone());

        let result = generate_outline_dated(&ctx, &request(OutputMode::Structured, 22), DATE)
            .await
            .unwrap();

        assert_eq!(result.metadata().title, "Kedua");
        assert_eq!(result.metadata().total_scenes, 22);
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_production_truncated() {
        let mock = Arc::new(MockBackend::fixed(plain_scenes(10).to_string()));
        let ctx = ctx_with(mock.clone());

        let result = generate_outline_dated(&ctx, &request(OutputMode::PlainEnglish, 13), DATE)
            .await
            .unwrap();

        assert_eq!(mock.calls(), 2);
        assert_eq!(result.scenes().len(), 13);
        assert_eq!(result.scenes()[12].transition.to_scene, 13);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_count_and_merged_length() {
        for total in [1u32, 10, 11, 20, 31, 99] {
            let mock = Arc::new(MockBackend::fixed(plain_scenes(10).to_string()));
            let ctx = ctx_with(mock.clone());
            let result = generate_outline_dated(&ctx, &request(OutputMode::PlainLocal, total), DATE)
                .await
                .unwrap();

            let chunks = total.div_ceil(CHUNK_SIZE) as usize;
            assert_eq!(mock.calls(), chunks, "total = {total}");
            assert_eq!(result.scenes().len(), (chunks * 10).min(total as usize));
            for (i, scene) in result.scenes().iter().enumerate() {
                assert_eq!(scene.scene_number as usize, i + 1);
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_calls() {
        let mock = Arc::new(MockBackend::fixed("[]"));
        let ctx = ctx_with(mock.clone());
        let err = generate_outline_dated(&ctx, &request(OutputMode::PlainLocal, 0), DATE)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mock = Arc::new(MockBackend::fixed(plain_scenes(10).to_string()));
        let ctx = ExecCtx::builder(mock)
            .event_handler(Arc::new(FnEventHandler(move |e: Event| {
                sink.lock().unwrap().push(e)
            })))
            .build();

        generate_outline_dated(&ctx, &request(OutputMode::PlainLocal, 12), DATE)
            .await
            .unwrap();

        let events = events.lock().unwrap();
        assert!(matches!(events[0], Event::ChunkStart { index: 0, offset: 0, count: 10 }));
        assert!(matches!(events[2], Event::ChunkStart { index: 1, offset: 10, count: 2 }));
        assert!(matches!(events[3], Event::ChunkEnd { index: 1, scenes: 10, attempts: 1 }));
        assert!(matches!(events[4], Event::GenerationEnd { ok: true, scenes: 12 }));
    }
}
