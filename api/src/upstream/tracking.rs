use chrono::Utc;
use reqwest::Method;
use worklog_core::credential::Credential;
use worklog_core::tracking::{NewTimeEntry, TrackingEntry, UpstreamTimeEntry};

use super::call;
use crate::error::AppError;
use crate::state::AppState;

/// Stops whatever is running, then starts a new open-ended entry.
///
/// The stop must succeed before the create is issued: a failed stop aborts
/// the operation so the account never has two running timers.
pub async fn start_tracking(
    state: &AppState,
    secret: &str,
    workspace_id: i64,
    description: &str,
) -> Result<TrackingEntry, AppError> {
    let credential = Credential::tracking(secret);

    if let Some(stopped) = stop_current(state, &credential).await? {
        tracing::info!(entry_id = stopped.id, "Stopped running Toggl entry");
    }

    let url = format!(
        "{}/api/v9/workspaces/{}/time_entries",
        state.config.toggl_api_base, workspace_id
    );
    let payload = NewTimeEntry::running(
        description,
        workspace_id,
        state.config.toggl_created_with.as_str(),
        Utc::now(),
    );
    let payload = serde_json::to_value(&payload).map_err(|e| AppError::UpstreamPayload {
        message: e.to_string(),
    })?;

    let response = call(state, &credential, Method::POST, &url, Some(&payload)).await?;
    if !response.is_success() {
        tracing::warn!(
            workspace_id = workspace_id,
            status = response.status,
            "Toggl rejected new time entry"
        );
        return Err(AppError::TrackingStart(response.into_failure()));
    }

    let entry: TrackingEntry = response.body.decode::<UpstreamTimeEntry>()?.into();
    tracing::info!(
        entry_id = entry.id,
        workspace_id = entry.workspace_id,
        "Started Toggl entry"
    );
    Ok(entry)
}

/// Stops the account's running entry, if any. `204`, an empty body or JSON
/// `null` from the current-entry endpoint all mean nothing is running.
pub async fn stop_current(
    state: &AppState,
    credential: &Credential,
) -> Result<Option<TrackingEntry>, AppError> {
    let base = &state.config.toggl_api_base;

    let current_url = format!("{base}/api/v9/me/time_entries/current");
    let current = call(state, credential, Method::GET, &current_url, None).await?;
    if !current.is_success() {
        tracing::warn!(status = current.status, "Current Toggl entry lookup failed");
        return Err(AppError::TrackingStop(current.into_failure()));
    }
    if current.status == 204 || current.body.is_empty() {
        return Ok(None);
    }

    let running: UpstreamTimeEntry = current.body.decode()?;
    let workspace_id = running.workspace().ok_or_else(|| AppError::UpstreamPayload {
        message: format!("running entry {} has no workspace id", running.id),
    })?;

    let stop_url = format!(
        "{base}/api/v9/workspaces/{workspace_id}/time_entries/{}/stop",
        running.id
    );
    let stopped = call(state, credential, Method::PATCH, &stop_url, None).await?;
    if !stopped.is_success() {
        tracing::warn!(
            entry_id = running.id,
            status = stopped.status,
            "Stopping Toggl entry failed"
        );
        return Err(AppError::TrackingStop(stopped.into_failure()));
    }

    match stopped.body.decode::<UpstreamTimeEntry>() {
        Ok(entry) => Ok(Some(entry.into())),
        Err(_) => {
            let mut entry = TrackingEntry::from(running);
            entry.is_running = false;
            Ok(Some(entry))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::upstream::test_support::state_for;

    // base64("tok:api_token")
    const BASIC_AUTH: &str = "Basic dG9rOmFwaV90b2tlbg==";

    fn entry_json(id: i64, duration: i64) -> serde_json::Value {
        json!({
            "id": id,
            "description": "Write report",
            "workspace_id": 77,
            "wid": 77,
            "start": "2026-10-19T01:00:00+00:00",
            "duration": duration,
            "stop": null
        })
    }

    async fn mount_create(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v9/workspaces/77/time_entries"))
            .and(header("authorization", BASIC_AUTH))
            .and(body_partial_json(json!({
                "description": "Deep work",
                "workspace_id": 77,
                "created_with": "NotionTogglTimerApp",
                "duration": -1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 200,
                "description": "Deep work",
                "workspace_id": 77,
                "wid": 77,
                "start": "2026-10-19T02:00:00Z",
                "duration": -1,
                "stop": null
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn stops_running_entry_before_creating() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v9/me/time_entries/current"))
            .and(header("authorization", BASIC_AUTH))
            .respond_with(ResponseTemplate::new(200).set_body_json(entry_json(100, -1)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/v9/workspaces/77/time_entries/100/stop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(entry_json(100, 3600)))
            .expect(1)
            .mount(&server)
            .await;
        mount_create(&server).await;

        let state = state_for(&server.uri());
        let entry = start_tracking(&state, "tok", 77, "Deep work").await.unwrap();
        assert_eq!(entry.id, 200);
        assert!(entry.is_running);

        let calls: Vec<(String, String)> = server
            .received_requests()
            .await
            .expect("request recording is enabled")
            .iter()
            .map(|request| (request.method.to_string(), request.url.path().to_string()))
            .collect();
        assert_eq!(
            calls,
            vec![
                ("GET".to_string(), "/api/v9/me/time_entries/current".to_string()),
                ("PATCH".to_string(), "/api/v9/workspaces/77/time_entries/100/stop".to_string()),
                ("POST".to_string(), "/api/v9/workspaces/77/time_entries".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn no_content_means_nothing_to_stop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v9/me/time_entries/current"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        mount_create(&server).await;

        let state = state_for(&server.uri());
        start_tracking(&state, "tok", 77, "Deep work").await.unwrap();
    }

    #[tokio::test]
    async fn null_current_entry_means_nothing_to_stop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v9/me/time_entries/current"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let stopped = stop_current(&state, &Credential::tracking("tok")).await.unwrap();
        assert_eq!(stopped, None);
    }

    #[tokio::test]
    async fn failed_stop_aborts_start() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v9/me/time_entries/current"))
            .respond_with(ResponseTemplate::new(200).set_body_json(entry_json(100, -1)))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/v9/workspaces/77/time_entries/100/stop"))
            .respond_with(ResponseTemplate::new(500).set_body_string("stop failed"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        match start_tracking(&state, "tok", 77, "Deep work").await {
            Err(AppError::TrackingStop(failure)) => assert_eq!(failure.status, 500),
            other => panic!("expected TrackingStop, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_create_carries_upstream_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v9/me/time_entries/current"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v9/workspaces/77/time_entries"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Incorrect username and/or password"))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        match start_tracking(&state, "tok", 77, "Deep work").await {
            Err(AppError::TrackingStart(failure)) => {
                assert_eq!(failure.status, 403);
                assert_eq!(
                    failure.into_details(),
                    Some(json!("Incorrect username and/or password"))
                );
            }
            other => panic!("expected TrackingStart, got {other:?}"),
        }
    }
}
