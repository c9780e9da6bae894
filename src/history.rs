//! Write-only generation history.
//!
//! Every generate and motion call leaves one [`HistoryRecord`]. The store is
//! a collaborator behind the [`HistoryStore`] trait. [`TracingHistory`] logs
//! each record and keeps nothing; [`InMemoryHistory`] keeps a bounded window
//! of recent records.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Tool key for outline generation.
pub const TOOL_STORY_PROMPT: &str = "storyprompt";
/// Tool key for motion prompts.
pub const TOOL_MOTION_PROMPT: &str = "motionprompt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Ok,
    Error,
}

/// One row of generation history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub user_id: Option<String>,
    pub tool_key: String,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub style: Option<String>,
    pub topic: Option<String>,
    pub story: Option<String>,
    pub scene_count: Option<u32>,
    pub model: String,
    pub prompt: Option<String>,
    /// Full result JSON for structured outputs.
    pub response_json: Option<Value>,
    /// Plain text reply for text outputs.
    pub response_text: Option<String>,
    pub status: HistoryStatus,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    /// Remaining input parameters.
    pub meta: Value,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// An `ok` record for `tool_key` with nothing else filled in.
    pub fn new(tool_key: &str, model: impl Into<String>) -> Self {
        Self {
            user_id: None,
            tool_key: tool_key.to_string(),
            subject: None,
            grade: None,
            style: None,
            topic: None,
            story: None,
            scene_count: None,
            model: model.into(),
            prompt: None,
            response_json: None,
            response_text: None,
            status: HistoryStatus::Ok,
            error_message: None,
            duration_ms: 0,
            meta: Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Mark the record failed with `message`.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = HistoryStatus::Error;
        self.error_message = Some(message.into());
        self
    }
}

/// Sink for history records.
///
/// Callers log a failed write and carry on; it never changes a response.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, record: HistoryRecord) -> Result<()>;
}

/// Writes each record as a structured log event and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHistory;

#[async_trait]
impl HistoryStore for TracingHistory {
    async fn record(&self, record: HistoryRecord) -> Result<()> {
        tracing::info!(
            target: "classtoon::history",
            tool = %record.tool_key,
            user_id = record.user_id.as_deref().unwrap_or("-"),
            model = %record.model,
            status = ?record.status,
            scene_count = record.scene_count,
            story = record.story.as_deref(),
            duration_ms = record.duration_ms,
            error = record.error_message.as_deref(),
            "history record"
        );
        Ok(())
    }
}

/// Process-local store, newest record last.
///
/// Holds at most `capacity` records; the oldest is dropped to make room.
#[derive(Debug)]
pub struct InMemoryHistory {
    capacity: usize,
    records: Mutex<VecDeque<HistoryRecord>>,
}

impl InMemoryHistory {
    /// Records kept by [`InMemoryHistory::new`].
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// A store that keeps the latest `capacity` records (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the retained records, oldest first.
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records
            .lock()
            .map(|guard| guard.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn record(&self, record: HistoryRecord) -> Result<()> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| crate::GenerationError::Other("history store poisoned".into()))?;
        while guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(record);
        Ok(())
    }
}
