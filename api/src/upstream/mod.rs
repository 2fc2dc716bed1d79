//! Outbound calls to Notion and Toggl.
//!
//! Every provider call goes through [`call`], which attaches the headers the
//! credential builder derives and reads the whole response body. Calls within
//! one operation are awaited one after another.

pub mod discovery;
pub mod kpi;
pub mod relay;
pub mod tracking;

use axum::body::Bytes;
use axum::http::StatusCode;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use worklog_core::credential::{Credential, build_headers, is_body_bearing};

use crate::error::AppError;
use crate::state::AppState;

/// A provider response body: JSON when it decodes as JSON, the raw bytes otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Structured(Value),
    Raw(Bytes),
}

impl UpstreamBody {
    pub fn from_bytes(bytes: Bytes) -> Self {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => UpstreamBody::Structured(value),
            Err(_) => UpstreamBody::Raw(bytes),
        }
    }

    /// True for an empty body or a literal JSON `null`.
    pub fn is_empty(&self) -> bool {
        match self {
            UpstreamBody::Structured(value) => value.is_null(),
            UpstreamBody::Raw(bytes) => bytes.iter().all(u8::is_ascii_whitespace),
        }
    }

    /// Diagnostic payload for an error response.
    pub fn into_details(self) -> Option<Value> {
        match self {
            UpstreamBody::Structured(value) => Some(value),
            UpstreamBody::Raw(bytes) if bytes.is_empty() => None,
            UpstreamBody::Raw(bytes) => Some(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
        }
    }

    pub fn into_json(self) -> Result<Value, AppError> {
        match self {
            UpstreamBody::Structured(value) => Ok(value),
            UpstreamBody::Raw(_) => Err(AppError::UpstreamPayload {
                message: "expected a JSON body".to_string(),
            }),
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> Result<T, AppError> {
        serde_json::from_value(self.into_json()?).map_err(|e| AppError::UpstreamPayload {
            message: e.to_string(),
        })
    }
}

/// Non-success provider answer, kept intact for the caller's diagnostics.
#[derive(Debug)]
pub struct UpstreamFailure {
    pub status: u16,
    pub body: UpstreamBody,
}

impl UpstreamFailure {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY)
    }

    pub fn into_details(self) -> Option<Value> {
        self.body.into_details()
    }
}

#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<HeaderValue>,
    /// Body exactly as the provider sent it
    pub raw: Bytes,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_failure(self) -> UpstreamFailure {
        UpstreamFailure {
            status: self.status,
            body: self.body,
        }
    }
}

/// Header map for one call. Fails when the secret cannot travel in a header.
pub fn headers_for(
    state: &AppState,
    credential: &Credential,
    method: &Method,
) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    for (name, value) in build_headers(credential, method.as_str(), state.config.notion_revision) {
        let value = HeaderValue::from_str(&value).map_err(|_| {
            AppError::malformed("Token value contains characters not allowed in headers", "tokenValue")
        })?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}

/// Issues one provider call and buffers its response.
pub async fn call(
    state: &AppState,
    credential: &Credential,
    method: Method,
    url: &str,
    body: Option<&Value>,
) -> Result<UpstreamResponse, AppError> {
    let headers = headers_for(state, credential, &method)?;
    let mut request = state
        .http
        .request(method.clone(), url)
        .headers(headers);
    if let Some(body) = body {
        if is_body_bearing(method.as_str()) {
            request = request.body(body.to_string());
        }
    }

    tracing::debug!(method = %method, url = url, kind = credential.kind.as_str(), "Calling upstream");
    let response = request.send().await.map_err(|e| {
        tracing::warn!(method = %method, url = url, error = %e, "Upstream request failed");
        AppError::UpstreamUnreachable {
            message: e.to_string(),
        }
    })?;

    let status = response.status().as_u16();
    let content_type = response.headers().get(reqwest::header::CONTENT_TYPE).cloned();
    let bytes = response.bytes().await?;
    tracing::debug!(method = %method, url = url, status = status, bytes = bytes.len(), "Upstream responded");

    Ok(UpstreamResponse {
        status,
        content_type,
        body: UpstreamBody::from_bytes(bytes.clone()),
        raw: bytes,
    })
}
