use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;

/// Inbound relay call as decoded from the browser's JSON body.
///
/// Every field is optional at the decoding layer; the router decides which
/// combination is required for the selected operation. Aliases keep older
/// clients working.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    /// Named operation (`getConfig`, `getKpi`, `startTracking`)
    #[serde(default, alias = "customEndpoint")]
    pub custom_operation: Option<String>,
    #[serde(default, alias = "dbId")]
    pub container_id: Option<String>,
    #[serde(default, alias = "dataSourceId")]
    pub source_id: Option<String>,
    /// Toggl workspace id, number or numeric string
    #[serde(default)]
    pub workspace_id: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    /// Absolute provider URL for a plain relay call
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    /// `primaryToken` or `trackingToken`
    #[serde(default, alias = "tokenKey")]
    pub token_kind: Option<String>,
    #[serde(default)]
    pub token_value: Option<String>,
}

impl ProxyRequest {
    /// The caller's secret, if one was actually supplied.
    pub fn secret(&self) -> Option<&str> {
        self.token_value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Operations the relay implements itself rather than tunnelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetConfig,
    GetKpi,
    StartTracking,
}

impl Operation {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim() {
            "getConfig" => Ok(Operation::GetConfig),
            "getKpi" => Ok(Operation::GetKpi),
            "startTracking" | "startTogglTracking" => Ok(Operation::StartTracking),
            other => Err(CoreError::UnknownOperation(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::GetConfig => "getConfig",
            Operation::GetKpi => "getKpi",
            Operation::StartTracking => "startTracking",
        }
    }
}

/// Blank strings count as absent.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Notion object ids are UUIDs, with or without dashes. Anything else would
/// let a caller splice extra path segments into the provider URL.
pub fn is_object_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}
