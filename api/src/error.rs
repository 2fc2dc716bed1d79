use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use worklog_core::error::{self, ApiError, CoreError};

use crate::upstream::UpstreamFailure;

/// Every way a relay call can fail. Converted to exactly one response at the
/// router boundary.
#[derive(Debug)]
pub enum AppError {
    /// Unknown or missing token kind (400)
    InvalidCredentialKind { received: Option<String> },
    /// No token value supplied (401)
    Unauthenticated,
    /// Body undecodable or a required field missing (400)
    MalformedRequest {
        message: String,
        field: Option<String>,
    },
    /// `customOperation` names nothing the relay implements (400)
    UnknownOperation { received: String },
    /// Container lookup returned non-success (upstream status)
    ContainerFetch(UpstreamFailure),
    /// Container has no data sources (404)
    NoQueryableSource { container_id: String },
    /// Source schema lookup returned non-success (upstream status)
    SourceFetch(UpstreamFailure),
    /// KPI query returned non-success (upstream status)
    Query(UpstreamFailure),
    /// Workspace id is not an integer (400)
    InvalidWorkspaceId { received: String },
    /// Looking up or stopping the running timer failed (upstream status)
    TrackingStop(UpstreamFailure),
    /// Creating the new timer failed (upstream status)
    TrackingStart(UpstreamFailure),
    /// Relay target outside the allow-list (403)
    ForbiddenTarget { host: String },
    /// Network-level failure reaching a provider (502)
    UpstreamUnreachable { message: String },
    /// Provider answered success with a payload we cannot read (502)
    UpstreamPayload { message: String },
}

impl AppError {
    pub fn malformed(message: impl Into<String>, field: &str) -> Self {
        AppError::MalformedRequest {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentialKind { .. }
            | AppError::MalformedRequest { .. }
            | AppError::UnknownOperation { .. }
            | AppError::InvalidWorkspaceId { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NoQueryableSource { .. } => StatusCode::NOT_FOUND,
            AppError::ForbiddenTarget { .. } => StatusCode::FORBIDDEN,
            AppError::ContainerFetch(failure)
            | AppError::SourceFetch(failure)
            | AppError::Query(failure)
            | AppError::TrackingStop(failure)
            | AppError::TrackingStart(failure) => failure.status_code(),
            AppError::UpstreamUnreachable { .. } | AppError::UpstreamPayload { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentialKind { .. } => error::codes::INVALID_CREDENTIAL_KIND,
            AppError::Unauthenticated => error::codes::UNAUTHENTICATED,
            AppError::MalformedRequest { .. } => error::codes::MALFORMED_REQUEST,
            AppError::UnknownOperation { .. } => error::codes::UNKNOWN_OPERATION,
            AppError::ContainerFetch(_) => error::codes::CONTAINER_FETCH_FAILED,
            AppError::NoQueryableSource { .. } => error::codes::NO_QUERYABLE_SOURCE,
            AppError::SourceFetch(_) => error::codes::SOURCE_FETCH_FAILED,
            AppError::Query(_) => error::codes::QUERY_FAILED,
            AppError::InvalidWorkspaceId { .. } => error::codes::INVALID_WORKSPACE_ID,
            AppError::TrackingStop(_) => error::codes::TRACKING_STOP_FAILED,
            AppError::TrackingStart(_) => error::codes::TRACKING_START_FAILED,
            AppError::ForbiddenTarget { .. } => error::codes::FORBIDDEN_TARGET,
            AppError::UpstreamUnreachable { .. } => error::codes::UPSTREAM_UNREACHABLE,
            AppError::UpstreamPayload { .. } => error::codes::UPSTREAM_PAYLOAD_INVALID,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();
        let status = self.status();
        let code = self.code().to_string();

        let (message, details, field, docs_hint) = match self {
            AppError::InvalidCredentialKind { received } => (
                match received {
                    Some(kind) => format!("Unsupported token kind '{kind}'"),
                    None => "Token kind missing in request body".to_string(),
                },
                None,
                Some("tokenKind".to_string()),
                Some("Use 'primaryToken' for Notion or 'trackingToken' for Toggl.".to_string()),
            ),
            AppError::Unauthenticated => (
                "Token value missing in request body".to_string(),
                None,
                Some("tokenValue".to_string()),
                None,
            ),
            AppError::MalformedRequest { message, field } => (message, None, field, None),
            AppError::UnknownOperation { received } => (
                format!("Unknown custom operation '{received}'"),
                None,
                Some("customOperation".to_string()),
                Some("Supported operations: getConfig, getKpi, startTracking.".to_string()),
            ),
            AppError::ContainerFetch(failure) => (
                "Failed to retrieve the database".to_string(),
                failure.into_details(),
                None,
                None,
            ),
            AppError::NoQueryableSource { container_id } => (
                format!("Database '{container_id}' has no data sources"),
                None,
                Some("containerId".to_string()),
                Some("Share the database with the integration and make sure it has at least one data source.".to_string()),
            ),
            AppError::SourceFetch(failure) => (
                "Failed to retrieve the data source".to_string(),
                failure.into_details(),
                None,
                None,
            ),
            AppError::Query(failure) => (
                "Failed to query the data source".to_string(),
                failure.into_details(),
                None,
                None,
            ),
            AppError::InvalidWorkspaceId { received } => (
                format!("Workspace id '{received}' is not an integer"),
                None,
                Some("workspaceId".to_string()),
                None,
            ),
            AppError::TrackingStop(failure) => (
                "Failed to stop the running Toggl entry".to_string(),
                failure.into_details(),
                None,
                None,
            ),
            AppError::TrackingStart(failure) => (
                "Failed to start Toggl entry".to_string(),
                failure.into_details(),
                None,
                None,
            ),
            AppError::ForbiddenTarget { host } => (
                format!("Relaying to host '{host}' is not allowed"),
                None,
                Some("targetUrl".to_string()),
                Some("Only the configured provider API hosts can be relayed to.".to_string()),
            ),
            AppError::UpstreamUnreachable { message } => {
                tracing::error!(error = %message, "Upstream unreachable");
                ("Upstream provider unreachable".to_string(), Some(message.into()), None, None)
            }
            AppError::UpstreamPayload { message } => {
                tracing::error!(error = %message, "Upstream payload invalid");
                ("Upstream provider returned an unreadable payload".to_string(), Some(message.into()), None, None)
            }
        };

        (
            status,
            Json(ApiError {
                code,
                message,
                details,
                field,
                request_id,
                docs_hint,
            }),
        )
            .into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidCredentialKind(kind) => AppError::InvalidCredentialKind {
                received: Some(kind),
            },
            CoreError::InvalidWorkspaceId(received) => AppError::InvalidWorkspaceId { received },
            CoreError::UnknownOperation(received) => AppError::UnknownOperation { received },
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::UpstreamPayload {
                message: err.to_string(),
            }
        } else {
            AppError::UpstreamUnreachable {
                message: err.to_string(),
            }
        }
    }
}
