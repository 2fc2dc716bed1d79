use std::sync::Arc;

use crate::config::RelayConfig;

/// Shared per-process state. Holds no per-call data: credentials travel with
/// each request and are dropped when it completes.
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("worklog-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }
}
