use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build a CORS layer from the `RELAY_CORS_ORIGINS` env var.
///
/// - Origins: comma-separated list, or `*` for any origin (default `*`)
/// - Methods: GET, POST, PATCH, OPTIONS
/// - Headers: Content-Type, Authorization, Notion-Version
/// - Max age: 3600s
///
/// Pre-flight requests are answered here and never reach the relay handlers.
/// Credentials travel in the JSON body, so cookies are never allowed.
pub fn build_cors_layer() -> CorsLayer {
    build_cors_layer_from(std::env::var("RELAY_CORS_ORIGINS").ok().as_deref())
}

pub fn build_cors_layer_from(origins: Option<&str>) -> CorsLayer {
    let origins = origins.map(str::trim).filter(|value| !value.is_empty()).unwrap_or("*");

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = origin, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static("notion-version"),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}
