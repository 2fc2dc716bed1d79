//! Named provider constants.
//!
//! The discovery protocol depends on an exact mapping from `Notion-Version`
//! to behavior, so the revision is an enum rather than a free-form string.

use serde::Serialize;

pub const DEFAULT_NOTION_API_BASE: &str = "https://api.notion.com";
pub const DEFAULT_TOGGL_API_BASE: &str = "https://api.track.toggl.com";

/// Tag Toggl stores in `created_with` for entries started through the relay.
pub const DEFAULT_TOGGL_CREATED_WITH: &str = "NotionTogglTimerApp";

/// Basic-auth password Toggl expects when the username is an API token.
pub const TOGGL_API_TOKEN_PASSWORD: &str = "api_token";

pub const DEFAULT_CATEGORY_PROPERTY: &str = "カテゴリ";
pub const DEFAULT_DEPARTMENT_PROPERTY: &str = "部門";
pub const DEFAULT_TIME_PROPERTY: &str = "時間";
pub const DEFAULT_COMPLETED_PROPERTY: &str = "完了日";

/// Trailing window bounding the KPI query.
pub const DEFAULT_KPI_LOOKBACK_DAYS: u32 = 30;

/// Notion API revisions the relay knows how to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum NotionRevision {
    /// Databases expose their schema and are queried directly.
    #[serde(rename = "2022-06-28")]
    Legacy,
    /// Databases are containers of data sources; schema and queries live on
    /// the data source.
    #[default]
    #[serde(rename = "2025-09-03")]
    DataSources,
}

impl NotionRevision {
    pub fn header_value(self) -> &'static str {
        match self {
            NotionRevision::Legacy => "2022-06-28",
            NotionRevision::DataSources => "2025-09-03",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "2022-06-28" => Some(NotionRevision::Legacy),
            "2025-09-03" => Some(NotionRevision::DataSources),
            _ => None,
        }
    }

    /// Path of the schema-bearing object for a source id.
    pub fn source_path(self, source_id: &str) -> String {
        match self {
            NotionRevision::Legacy => format!("/v1/databases/{source_id}"),
            NotionRevision::DataSources => format!("/v1/data_sources/{source_id}"),
        }
    }

    pub fn query_path(self, source_id: &str) -> String {
        format!("{}/query", self.source_path(source_id))
    }
}

/// Unit the time property's number is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeUnit {
    #[default]
    Hours,
    Minutes,
}

impl TimeUnit {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "hours" | "hour" | "h" => Some(TimeUnit::Hours),
            "minutes" | "minute" | "min" | "m" => Some(TimeUnit::Minutes),
            _ => None,
        }
    }

    /// Converts a raw property number to whole minutes.
    pub fn to_minutes(self, value: f64) -> f64 {
        match self {
            TimeUnit::Hours => (value * 60.0).round(),
            TimeUnit::Minutes => value.round(),
        }
    }
}

/// Notion property type holding the tracked time. Queries must filter on
/// the same type the property actually has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeKind {
    #[default]
    Formula,
    Number,
}

impl TimeKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "formula" => Some(TimeKind::Formula),
            "number" => Some(TimeKind::Number),
            _ => None,
        }
    }

    /// Reads the numeric value of a time property from a result page.
    pub fn read(self, property: &serde_json::Value) -> Option<f64> {
        match self {
            TimeKind::Formula => property["formula"]["number"].as_f64(),
            TimeKind::Number => property["number"].as_f64(),
        }
    }

    /// Filter condition matching records whose time property has a value.
    pub fn is_not_empty(self) -> serde_json::Value {
        match self {
            TimeKind::Formula => serde_json::json!({ "formula": { "number": { "is_not_empty": true } } }),
            TimeKind::Number => serde_json::json!({ "number": { "is_not_empty": true } }),
        }
    }
}

/// Property names read from the container schema and from query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyNames {
    pub category: String,
    pub department: String,
    pub time: String,
    pub time_kind: TimeKind,
    pub time_unit: TimeUnit,
    pub completed: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY_PROPERTY.to_string(),
            department: DEFAULT_DEPARTMENT_PROPERTY.to_string(),
            time: DEFAULT_TIME_PROPERTY.to_string(),
            time_kind: TimeKind::Formula,
            time_unit: TimeUnit::Hours,
            completed: DEFAULT_COMPLETED_PROPERTY.to_string(),
        }
    }
}
