//! JSON extractor that reports decode failures as `MalformedRequest`.
//!
//! Use `AppJson<T>` in place of `axum::Json<T>` so a bad body still gets the
//! relay's error shape instead of axum's plain-text rejection.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();
    let field = extract_field_from_serde_message(&body_text).unwrap_or_else(|| "body".to_string());
    tracing::debug!(field = %field, error = %body_text, "Rejected request body");

    AppError::MalformedRequest {
        message: format!("Invalid request body: {body_text}"),
        field: Some(field),
    }
}

/// Pulls the field name out of serde's missing/unknown/duplicate field messages.
fn extract_field_from_serde_message(msg: &str) -> Option<String> {
    for marker in ["missing field `", "unknown field `", "duplicate field `"] {
        if let Some(start) = msg.find(marker) {
            let after = &msg[start + marker.len()..];
            if let Some(end) = after.find('`') {
                return Some(after[..end].to_string());
            }
        }
    }
    None
}
