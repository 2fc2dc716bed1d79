use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use worklog_core::credential::{Credential, CredentialKind};
use worklog_core::error::ApiError;
use worklog_core::request::{Operation, ProxyRequest, is_object_id, non_empty};
use worklog_core::tracking::parse_workspace_id;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::upstream::{discovery, kpi, relay, tracking};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/proxy", post(proxy))
}

/// Relay entry point
///
/// With `customOperation` set, runs one of the relay's own operations
/// (database discovery, KPI aggregation, timer start). With only `targetUrl`
/// set, forwards the call to the provider and returns its status and body as
/// received. Pre-flight requests are answered by the CORS layer.
#[utoipa::path(
    post,
    path = "/api/proxy",
    request_body = ProxyRequest,
    responses(
        (status = 200, description = "DiscoveredSource for getConfig, KpiSummary for getKpi, TrackingEntry for startTracking; relayed calls return the provider's status and body"),
        (status = 400, description = "Malformed request, unknown operation, bad token kind or workspace id", body = ApiError),
        (status = 401, description = "Token value missing", body = ApiError),
        (status = 403, description = "Relay target not allowed", body = ApiError),
        (status = 404, description = "Database has no data sources", body = ApiError),
        (status = 502, description = "Provider unreachable or unreadable", body = ApiError)
    ),
    tag = "relay"
)]
pub async fn proxy(
    State(state): State<AppState>,
    AppJson(request): AppJson<ProxyRequest>,
) -> Result<Response, AppError> {
    dispatch(&state, &request).await
}

/// Selects exactly one handler for a decoded request.
pub async fn dispatch(state: &AppState, request: &ProxyRequest) -> Result<Response, AppError> {
    let Some(secret) = request.secret() else {
        tracing::warn!("Rejected relay call without token value");
        return Err(AppError::Unauthenticated);
    };

    if let Some(raw) = non_empty(request.custom_operation.as_deref()) {
        let operation = Operation::parse(raw)?;
        tracing::info!(operation = operation.as_str(), "Dispatching custom operation");
        return match operation {
            Operation::GetConfig => {
                let container_id = object_id(request.container_id.as_deref(), "containerId")?;
                let discovered = discovery::discover(state, container_id, secret).await?;
                Ok(Json(discovered).into_response())
            }
            Operation::GetKpi => {
                let source_id = object_id(request.source_id.as_deref(), "sourceId")?;
                let summary = kpi::compute_kpi(state, source_id, secret).await?;
                Ok(Json(summary).into_response())
            }
            Operation::StartTracking => {
                let workspace_id = request
                    .workspace_id
                    .as_ref()
                    .filter(|value| !value.is_null())
                    .ok_or_else(|| {
                        AppError::malformed("workspaceId is required for startTracking", "workspaceId")
                    })?;
                let workspace_id = parse_workspace_id(workspace_id)?;
                let description = non_empty(request.description.as_deref()).ok_or_else(|| {
                    AppError::malformed("description is required for startTracking", "description")
                })?;
                let entry =
                    tracking::start_tracking(state, secret, workspace_id, description).await?;
                Ok(Json(entry).into_response())
            }
        };
    }

    if let Some(target_url) = non_empty(request.target_url.as_deref()) {
        let kind = match non_empty(request.token_kind.as_deref()) {
            Some(kind) => CredentialKind::parse(kind)?,
            None => return Err(AppError::InvalidCredentialKind { received: None }),
        };
        let credential = Credential {
            kind,
            secret: secret.to_string(),
        };
        let response = relay::relay(
            state,
            target_url,
            request.method.as_deref(),
            request.body.as_ref(),
            &credential,
        )
        .await?;
        return Ok(response.into_response());
    }

    Err(AppError::MalformedRequest {
        message: "Request must name a customOperation or a targetUrl".to_string(),
        field: None,
    })
}

fn object_id<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
    let value = non_empty(value)
        .ok_or_else(|| AppError::malformed(format!("{field} is required"), field))?;
    if !is_object_id(value) {
        return Err(AppError::malformed(
            format!("{field} must be a Notion object id"),
            field,
        ));
    }
    Ok(value)
}
