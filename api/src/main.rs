use std::net::SocketAddr;

use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod extract;
mod middleware;
mod routes;
mod state;
mod upstream;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Worklog Relay",
        version = "0.1.0",
        description = "Credential-forwarding relay between a browser client and the Notion and Toggl Track APIs."
    ),
    paths(routes::health::health_check, routes::proxy::proxy),
    components(schemas(
        HealthResponse,
        worklog_core::error::ApiError,
        worklog_core::request::ProxyRequest,
        worklog_core::schema::DiscoveredSource,
        worklog_core::kpi::KpiSummary,
        worklog_core::tracking::TrackingEntry,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Notion API revision sent on primary-provider calls
    pub notion_version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worklog_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let relay_config = match config::RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid relay configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(
        notion_version = relay_config.notion_revision.header_value(),
        timezone = %relay_config.timezone,
        kpi_lookback_days = relay_config.kpi_lookback_days,
        "Relay configuration loaded"
    );

    let port = relay_config.port;
    let app_state = state::AppState::new(relay_config).expect("Failed to build HTTP client");

    let cors_layer = middleware::cors::build_cors_layer();

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::proxy::router())
        .layer(axum::middleware::from_fn(middleware::security_headers::apply))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Worklog relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
