use serde::Serialize;
use utoipa::ToSchema;

/// Structured error body returned for every failed relay call.
///
/// Upstream failures keep the provider's status code on the HTTP response and
/// carry the provider's diagnostic payload in `details`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code (see [`codes`])
    pub code: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Upstream diagnostic payload, verbatim when it was JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Which request field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Request ID for log correlation
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the relay
pub mod codes {
    pub const INVALID_CREDENTIAL_KIND: &str = "invalid_credential_kind";
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    pub const MALFORMED_REQUEST: &str = "malformed_request";
    pub const UNKNOWN_OPERATION: &str = "unknown_operation";
    pub const CONTAINER_FETCH_FAILED: &str = "container_fetch_failed";
    pub const NO_QUERYABLE_SOURCE: &str = "no_queryable_source";
    pub const SOURCE_FETCH_FAILED: &str = "source_fetch_failed";
    pub const QUERY_FAILED: &str = "query_failed";
    pub const INVALID_WORKSPACE_ID: &str = "invalid_workspace_id";
    pub const TRACKING_STOP_FAILED: &str = "tracking_stop_failed";
    pub const TRACKING_START_FAILED: &str = "tracking_start_failed";
    pub const FORBIDDEN_TARGET: &str = "forbidden_target";
    pub const UPSTREAM_UNREACHABLE: &str = "upstream_unreachable";
    pub const UPSTREAM_PAYLOAD_INVALID: &str = "upstream_payload_invalid";
}

/// Validation failures raised by the pure core, before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("unsupported token kind '{0}'")]
    InvalidCredentialKind(String),
    #[error("workspace id '{0}' is not an integer")]
    InvalidWorkspaceId(String),
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
}
