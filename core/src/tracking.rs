use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::CoreError;

/// Marker Toggl uses for a timer that is still running.
pub const RUNNING_DURATION: i64 = -1;

/// A Toggl time entry as returned to the relay's caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEntry {
    pub id: i64,
    pub description: Option<String>,
    pub workspace_id: i64,
    pub started_at: DateTime<Utc>,
    pub is_running: bool,
}

/// Time entry payload as Toggl's v9 API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamTimeEntry {
    pub id: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<i64>,
    /// Older payloads carry the workspace only under its short name
    #[serde(default)]
    pub wid: Option<i64>,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub stop: Option<String>,
}

impl UpstreamTimeEntry {
    pub fn workspace(&self) -> Option<i64> {
        self.workspace_id.or(self.wid)
    }
}

impl From<UpstreamTimeEntry> for TrackingEntry {
    fn from(entry: UpstreamTimeEntry) -> Self {
        let is_running = match entry.duration {
            Some(duration) => duration < 0,
            None => entry.stop.is_none(),
        };
        Self {
            id: entry.id,
            workspace_id: entry.workspace().unwrap_or_default(),
            description: entry.description,
            started_at: entry.start,
            is_running,
        }
    }
}

/// Body of the create-time-entry call.
#[derive(Debug, Clone, Serialize)]
pub struct NewTimeEntry {
    pub description: String,
    pub workspace_id: i64,
    pub created_with: String,
    pub start: String,
    pub duration: i64,
}

impl NewTimeEntry {
    pub fn running(
        description: impl Into<String>,
        workspace_id: i64,
        created_with: impl Into<String>,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            description: description.into(),
            workspace_id,
            created_with: created_with.into(),
            start: start.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration: RUNNING_DURATION,
        }
    }
}

/// Toggl requires numeric workspace ids; browsers often send them as strings.
pub fn parse_workspace_id(value: &Value) -> Result<i64, CoreError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| CoreError::InvalidWorkspaceId(number.to_string())),
        Value::String(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| CoreError::InvalidWorkspaceId(raw.clone())),
        other => Err(CoreError::InvalidWorkspaceId(other.to_string())),
    }
}
