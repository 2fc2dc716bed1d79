use std::fmt;

use base64::Engine;

use crate::config::{NotionRevision, TOGGL_API_TOKEN_PASSWORD};
use crate::error::CoreError;

/// Which provider a caller-supplied secret belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Notion integration token, sent as a bearer token.
    Primary,
    /// Toggl API token, sent as basic auth.
    Tracking,
}

impl CredentialKind {
    /// Accepts the canonical names plus the names older clients send.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim() {
            "primaryToken" | "notionToken" => Ok(CredentialKind::Primary),
            "trackingToken" | "togglApiToken" => Ok(CredentialKind::Tracking),
            other => Err(CoreError::InvalidCredentialKind(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CredentialKind::Primary => "primaryToken",
            CredentialKind::Tracking => "trackingToken",
        }
    }
}

/// A secret scoped to a single inbound call.
#[derive(Clone)]
pub struct Credential {
    pub kind: CredentialKind,
    pub secret: String,
}

impl Credential {
    pub fn primary(secret: impl Into<String>) -> Self {
        Self {
            kind: CredentialKind::Primary,
            secret: secret.into(),
        }
    }

    pub fn tracking(secret: impl Into<String>) -> Self {
        Self {
            kind: CredentialKind::Tracking,
            secret: secret.into(),
        }
    }

    pub fn authorization(&self) -> String {
        match self.kind {
            CredentialKind::Primary => format!("Bearer {}", self.secret),
            CredentialKind::Tracking => {
                let pair = format!("{}:{}", self.secret, TOGGL_API_TOKEN_PASSWORD);
                format!(
                    "Basic {}",
                    base64::engine::general_purpose::STANDARD.encode(pair)
                )
            }
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// POST, PATCH and PUT carry a JSON body; everything else goes out bare.
pub fn is_body_bearing(method: &str) -> bool {
    matches!(
        method.to_ascii_uppercase().as_str(),
        "POST" | "PATCH" | "PUT"
    )
}

/// Header set for one outbound provider call.
pub fn build_headers(
    credential: &Credential,
    method: &str,
    revision: NotionRevision,
) -> Vec<(&'static str, String)> {
    let mut headers = vec![("authorization", credential.authorization())];
    if credential.kind == CredentialKind::Primary {
        headers.push(("notion-version", revision.header_value().to_string()));
    }
    if is_body_bearing(method) {
        headers.push(("content-type", "application/json".to_string()));
    }
    headers
}
