use axum::body::{Body, Bytes};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use reqwest::Method;
use reqwest::header::HeaderValue;
use serde_json::Value;
use worklog_core::credential::Credential;

use super::{UpstreamBody, UpstreamResponse, call};
use crate::config::RelayConfig;
use crate::error::AppError;
use crate::state::AppState;

const RELAYABLE_METHODS: &[&str] = &["GET", "POST", "PATCH", "PUT", "DELETE"];

/// Provider answer handed back to the browser as received.
///
/// `body` is the classified view used for logging and inspection; the bytes
/// written to the caller are always `raw`, untouched.
#[derive(Debug)]
pub struct RelayResponse {
    pub status: u16,
    pub content_type: Option<HeaderValue>,
    pub raw: Bytes,
    pub body: UpstreamBody,
}

impl From<UpstreamResponse> for RelayResponse {
    fn from(response: UpstreamResponse) -> Self {
        Self {
            status: response.status,
            content_type: response.content_type,
            raw: response.raw,
            body: response.body,
        }
    }
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let content_type = match (self.content_type, &self.body) {
            (Some(content_type), _) => Some(content_type),
            (None, UpstreamBody::Structured(_)) => {
                Some(HeaderValue::from_static("application/json"))
            }
            (None, UpstreamBody::Raw(_)) => None,
        };
        let mut response = (status, Body::from(self.raw)).into_response();
        if let Some(content_type) = content_type {
            response.headers_mut().insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}

/// Forwards one call to a provider and returns its status and body
/// unchanged, success or not.
pub async fn relay(
    state: &AppState,
    target_url: &str,
    method: Option<&str>,
    body: Option<&Value>,
    credential: &Credential,
) -> Result<RelayResponse, AppError> {
    let url = validate_target(target_url, &state.config)?;
    let method = parse_method(method)?;

    let response = call(state, credential, method.clone(), url.as_str(), body).await?;
    tracing::info!(
        method = %method,
        host = url.host_str().unwrap_or_default(),
        path = url.path(),
        status = response.status,
        "Relayed provider call"
    );
    Ok(response.into())
}

/// Absolute http(s) URL whose host passes the allow-list.
pub fn validate_target(target_url: &str, config: &RelayConfig) -> Result<url::Url, AppError> {
    let url = url::Url::parse(target_url.trim())
        .map_err(|e| AppError::malformed(format!("Invalid targetUrl: {e}"), "targetUrl"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::malformed(
            "targetUrl must use http or https",
            "targetUrl",
        ));
    }
    let host = url
        .host_str()
        .ok_or_else(|| AppError::malformed("targetUrl has no host", "targetUrl"))?;
    if !config.host_allowed(host) {
        tracing::warn!(host = host, "Rejected relay to host outside allow-list");
        return Err(AppError::ForbiddenTarget {
            host: host.to_string(),
        });
    }
    // credentials never travel in cleartext to a listed provider
    if config.allowed_hosts.is_some() && url.scheme() != "https" {
        return Err(AppError::malformed(
            "targetUrl must use https for provider hosts",
            "targetUrl",
        ));
    }
    Ok(url)
}

/// Missing method means GET.
pub fn parse_method(method: Option<&str>) -> Result<Method, AppError> {
    let raw = method
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("GET")
        .to_ascii_uppercase();
    if !RELAYABLE_METHODS.contains(&raw.as_str()) {
        return Err(AppError::malformed(
            format!("Unsupported method '{raw}'"),
            "method",
        ));
    }
    Method::from_bytes(raw.as_bytes())
        .map_err(|_| AppError::malformed(format!("Unsupported method '{raw}'"), "method"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::upstream::test_support::state_for;

    #[test]
    fn method_defaults_to_get_and_is_case_insensitive() {
        assert_eq!(parse_method(None).unwrap(), Method::GET);
        assert_eq!(parse_method(Some("patch")).unwrap(), Method::PATCH);
        assert!(matches!(
            parse_method(Some("TRACE")),
            Err(AppError::MalformedRequest { .. })
        ));
    }

    #[test]
    fn target_must_be_absolute_and_allowed() {
        let config = RelayConfig::default();
        assert!(validate_target("https://api.notion.com/v1/users/me", &config).is_ok());
        assert!(matches!(
            validate_target("/v1/users/me", &config),
            Err(AppError::MalformedRequest { .. })
        ));
        assert!(matches!(
            validate_target("file:///etc/passwd", &config),
            Err(AppError::MalformedRequest { .. })
        ));
        assert!(matches!(
            validate_target("https://169.254.169.254/latest/meta-data", &config),
            Err(AppError::ForbiddenTarget { .. })
        ));
    }

    #[test]
    fn listed_hosts_require_https() {
        let config = RelayConfig::default();
        match validate_target("http://api.notion.com/v1/users/me", &config) {
            Err(AppError::MalformedRequest { field, .. }) => {
                assert_eq!(field.as_deref(), Some("targetUrl"))
            }
            other => panic!("expected MalformedRequest, got {other:?}"),
        }

        let open = RelayConfig {
            allowed_hosts: None,
            ..RelayConfig::default()
        };
        assert!(validate_target("http://127.0.0.1:8080/v1/users/me", &open).is_ok());
    }

    #[tokio::test]
    async fn relays_json_body_and_preserves_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/pages/p1"))
            .and(header("authorization", "Bearer secret"))
            .and(header("notion-version", "2025-09-03"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "archived": true })))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "object": "error",
                "code": "conflict_error"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let body = json!({ "archived": true });
        let response = relay(
            &state,
            &format!("{}/v1/pages/p1", server.uri()),
            Some("PATCH"),
            Some(&body),
            &Credential::primary("secret"),
        )
        .await
        .unwrap();

        assert_eq!(response.status, 409);
        assert_eq!(
            response.body,
            UpstreamBody::Structured(json!({ "object": "error", "code": "conflict_error" }))
        );
    }

    #[tokio::test]
    async fn json_bodies_are_relayed_byte_for_byte() {
        let server = MockServer::start().await;
        let upstream = r#"{"object":"list","results":[],"has_more":false, "amount": 1.50, "id": 123456789012345678901234}"#;
        Mock::given(method("POST"))
            .and(path("/v1/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(upstream, "application/json; charset=utf-8"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let query = json!({ "query": "" });
        let response = relay(
            &state,
            &format!("{}/v1/search", server.uri()),
            Some("POST"),
            Some(&query),
            &Credential::primary("secret"),
        )
        .await
        .unwrap();
        assert!(matches!(response.body, UpstreamBody::Structured(_)));

        let http_response = response.into_response();
        assert_eq!(http_response.status(), StatusCode::OK);
        assert_eq!(
            http_response
                .headers()
                .get(axum::http::header::CONTENT_TYPE)
                .expect("content-type should be forwarded"),
            "application/json; charset=utf-8"
        );
        let bytes = axum::body::to_bytes(http_response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], upstream.as_bytes());
    }

    #[tokio::test]
    async fn get_requests_never_carry_a_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v9/me"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
            .expect(1)
            .mount(&server)
            .await;

        let state = state_for(&server.uri());
        let ignored = json!({ "ignored": true });
        let response = relay(
            &state,
            &format!("{}/api/v9/me", server.uri()),
            None,
            Some(&ignored),
            &Credential::tracking("tok"),
        )
        .await
        .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].body.is_empty());
        assert_eq!(response.status, 200);
        assert_eq!(response.body, UpstreamBody::Raw("plain text".into()));

        let http_response = response.into_response();
        let bytes = axum::body::to_bytes(http_response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"plain text");
    }
}
