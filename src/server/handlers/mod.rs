pub mod health;
pub mod motion;
pub mod story;

use axum::http::HeaderMap;

use crate::history::HistoryRecord;
use crate::server::state::AppState;

/// Header carrying the caller's user id, set by the auth proxy in front.
pub const USER_ID_HEADER: &str = "x-user-id";

pub(crate) fn user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Store `record`; a failed write is logged and otherwise ignored.
pub(crate) async fn write_history(state: &AppState, record: HistoryRecord) {
    let tool = record.tool_key.clone();
    if let Err(err) = state.history.record(record).await {
        tracing::warn!(tool = %tool, error = %err, "failed to write history record");
    }
}

/// `value` when set, `default` when the field was omitted.
pub(crate) fn or_default(value: Option<String>, default: &str) -> String {
    value.unwrap_or_else(|| default.to_string())
}
