use std::collections::HashSet;

use reqwest::Method;
use serde_json::json;
use worklog_core::credential::Credential;
use worklog_core::kpi::{KpiSummary, KpiWindows, TimeRecord, query_filter};

use super::call;
use crate::error::AppError;
use crate::state::AppState;

const QUERY_PAGE_SIZE: u32 = 100;

/// Weekly/monthly totals anchored at the current date in the relay's zone.
pub async fn compute_kpi(
    state: &AppState,
    source_id: &str,
    secret: &str,
) -> Result<KpiSummary, AppError> {
    let windows = KpiWindows::now(state.config.timezone, state.config.kpi_lookback_days);
    compute_kpi_for(state, source_id, secret, &windows).await
}

/// Runs the filtered query and folds every result page into one summary.
/// Any failing page fails the whole computation.
pub async fn compute_kpi_for(
    state: &AppState,
    source_id: &str,
    secret: &str,
    windows: &KpiWindows,
) -> Result<KpiSummary, AppError> {
    let config = &state.config;
    let credential = Credential::primary(secret);
    let url = format!(
        "{}{}",
        config.notion_api_base,
        config.notion_revision.query_path(source_id)
    );
    let filter = query_filter(&config.properties, windows);

    let mut summary = KpiSummary::default();
    let mut cursor: Option<String> = None;
    let mut seen_cursors: HashSet<String> = HashSet::new();
    let mut pages = 0u32;
    let mut records = 0usize;

    loop {
        let mut body = json!({ "filter": filter, "page_size": QUERY_PAGE_SIZE });
        if let Some(cursor) = &cursor {
            body["start_cursor"] = json!(cursor);
        }

        let response = call(state, &credential, Method::POST, &url, Some(&body)).await?;
        if !response.is_success() {
            tracing::warn!(
                source_id = source_id,
                status = response.status,
                page = pages,
                "KPI query failed"
            );
            return Err(AppError::Query(response.into_failure()));
        }
        let page = response.body.into_json()?;
        pages += 1;

        for result in page["results"].as_array().into_iter().flatten() {
            summary.add(
                &TimeRecord::from_page(result, &config.properties, config.timezone),
                windows,
            );
            records += 1;
        }

        let next = page["next_cursor"].as_str().map(str::to_string);
        match (page["has_more"].as_bool(), next) {
            (Some(true), Some(next)) if seen_cursors.insert(next.clone()) => {
                cursor = Some(next);
            }
            (Some(true), Some(next)) => {
                tracing::warn!(source_id = source_id, cursor = %next, "Query cursor repeated, stopping");
                break;
            }
            _ => break,
        }
    }

    tracing::info!(
        source_id = source_id,
        pages = pages,
        records = records,
        week_minutes = summary.total_week_minutes,
        month_minutes = summary.total_month_minutes,
        "Computed KPI summary"
    );
    Ok(summary)
}
