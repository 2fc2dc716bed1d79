use reqwest::Method;
use worklog_core::config::NotionRevision;
use worklog_core::credential::Credential;
use worklog_core::schema::{DiscoveredSource, source_ids};

use super::call;
use crate::error::AppError;
use crate::state::AppState;

/// Resolves a database into its first data source and the option lists the
/// client needs. Runs on every call; nothing is cached.
pub async fn discover(
    state: &AppState,
    container_id: &str,
    secret: &str,
) -> Result<DiscoveredSource, AppError> {
    let config = &state.config;
    let credential = Credential::primary(secret);

    let container_url = format!("{}/v1/databases/{}", config.notion_api_base, container_id);
    let container = call(state, &credential, Method::GET, &container_url, None).await?;
    if !container.is_success() {
        tracing::warn!(
            container_id = container_id,
            status = container.status,
            "Database lookup failed"
        );
        return Err(AppError::ContainerFetch(container.into_failure()));
    }
    let container = container.body.into_json()?;

    let Some(source_id) = source_ids(&container, container_id, config.notion_revision)
        .into_iter()
        .next()
    else {
        tracing::warn!(container_id = container_id, "Database has no data sources");
        return Err(AppError::NoQueryableSource {
            container_id: container_id.to_string(),
        });
    };

    let schema = match config.notion_revision {
        // the legacy database payload already carries the schema
        NotionRevision::Legacy => container,
        NotionRevision::DataSources => {
            let source_url = format!(
                "{}{}",
                config.notion_api_base,
                config.notion_revision.source_path(&source_id)
            );
            let source = call(state, &credential, Method::GET, &source_url, None).await?;
            if !source.is_success() {
                tracing::warn!(
                    source_id = %source_id,
                    status = source.status,
                    "Data source lookup failed"
                );
                return Err(AppError::SourceFetch(source.into_failure()));
            }
            source.body.into_json()?
        }
    };

    let discovered = DiscoveredSource::from_schema(source_id, &schema, &config.properties);
    tracing::info!(
        container_id = container_id,
        source_id = %discovered.source_id,
        categories = discovered.categories.len(),
        departments = discovered.departments.len(),
        "Resolved database configuration"
    );
    Ok(discovered)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::RelayConfig;
    use crate::upstream::test_support::state_for;

    fn schema_payload() -> serde_json::Value {
        json!({
            "object": "data_source",
            "id": "s1",
            "properties": {
                "カテゴリ": { "type": "select", "select": { "options": [{ "name": "A" }, { "name": "B" }] } },
                "部門": { "type": "multi_select", "multi_select": { "options": [{ "name": "X" }] } }
            }
        })
    }

    #[tokio::test]
    async fn discovers_first_source_and_option_lists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/databases/db1"))
            .and(header("authorization", "Bearer secret"))
            .and(header("notion-version", "2025-09-03"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "database",
                "id": "db1",
                "data_sources": [{ "id": "s1", "name": "Tasks" }, { "id": "s2", "name": "Archive" }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/data_sources/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(schema_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let discovered = discover(&state, "db1", "secret").await.expect("discovery succeeds");
        assert_eq!(
            discovered,
            DiscoveredSource {
                source_id: "s1".to_string(),
                categories: vec!["A".to_string(), "B".to_string()],
                departments: vec!["X".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn empty_source_list_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/databases/db1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "object": "database", "data_sources": [] })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/data_sources/s1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let err = discover(&state, "db1", "secret").await.unwrap_err();
        assert!(matches!(err, AppError::NoQueryableSource { ref container_id } if container_id == "db1"));
    }

    #[tokio::test]
    async fn container_failure_preserves_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/databases/db1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "object": "error",
                "status": 404,
                "code": "object_not_found"
            })))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        match discover(&state, "db1", "secret").await {
            Err(AppError::ContainerFetch(failure)) => {
                assert_eq!(failure.status, 404);
                assert_eq!(failure.into_details().unwrap()["code"], "object_not_found");
            }
            other => panic!("expected ContainerFetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn source_failure_returns_no_partial_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/databases/db1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data_sources": [{ "id": "s1" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/data_sources/s1"))
            .respond_with(ResponseTemplate::new(403).set_body_string("restricted"))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        match discover(&state, "db1", "secret").await {
            Err(AppError::SourceFetch(failure)) => assert_eq!(failure.status, 403),
            other => panic!("expected SourceFetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_schema_properties_yield_empty_lists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/databases/db1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data_sources": [{ "id": "s1" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/data_sources/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "properties": {} })))
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let discovered = discover(&state, "db1", "secret").await.unwrap();
        assert!(discovered.categories.is_empty());
        assert!(discovered.departments.is_empty());
    }

    #[tokio::test]
    async fn legacy_revision_reads_schema_from_database() {
        let server = MockServer::start().await;
        let mut payload = schema_payload();
        payload["object"] = json!("database");
        Mock::given(method("GET"))
            .and(path("/v1/databases/db1"))
            .and(header("notion-version", "2022-06-28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload))
            .expect(1)
            .mount(&server)
            .await;

        let config = RelayConfig {
            notion_api_base: server.uri(),
            notion_revision: NotionRevision::Legacy,
            ..RelayConfig::default()
        };
        let state = AppState::new(config).unwrap();
        let discovered = discover(&state, "db1", "secret").await.unwrap();
        assert_eq!(discovered.source_id, "db1");
        assert_eq!(discovered.categories, vec!["A".to_string(), "B".to_string()]);
    }
}
