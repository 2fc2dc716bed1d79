//! Weekly/monthly minute totals folded from query results.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::config::PropertyNames;

/// Aggregated minutes for the current week and month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub total_week_minutes: u64,
    pub total_month_minutes: u64,
    /// Weekly minutes per category; records without a category are only in the total
    pub category_week_minutes: BTreeMap<String, u64>,
}

/// Date anchors for one KPI computation, all in the relay's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KpiWindows {
    pub week_start: NaiveDate,
    pub month_start: NaiveDate,
    /// Earliest completion date the upstream query asks for. Never later
    /// than either window start.
    pub lookback_start: NaiveDate,
}

impl KpiWindows {
    /// Weeks start on Sunday.
    pub fn for_date(today: NaiveDate, lookback_days: u32) -> Self {
        let week_start = today
            .checked_sub_days(Days::new(u64::from(
                today.weekday().num_days_from_sunday(),
            )))
            .unwrap_or(today);
        let month_start = today.with_day(1).unwrap_or(today);
        let trailing = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            week_start,
            month_start,
            lookback_start: trailing.min(week_start).min(month_start),
        }
    }

    pub fn now(tz: Tz, lookback_days: u32) -> Self {
        Self::for_date(chrono::Utc::now().with_timezone(&tz).date_naive(), lookback_days)
    }
}

/// One unit of tracked work as read from a query result page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeRecord {
    pub minutes: Option<u64>,
    pub completed_on: Option<NaiveDate>,
    pub category: Option<String>,
}

impl TimeRecord {
    pub fn from_page(page: &Value, names: &PropertyNames, tz: Tz) -> Self {
        let properties = &page["properties"];

        let time = &properties[names.time.as_str()];
        // float-to-int casts saturate, so absurd values clamp to u64::MAX
        let minutes = names
            .time_kind
            .read(time)
            .map(|value| names.time_unit.to_minutes(value))
            .filter(|minutes| minutes.is_finite() && *minutes > 0.0)
            .map(|minutes| minutes as u64);

        let completed_on = properties[names.completed.as_str()]["date"]["start"]
            .as_str()
            .and_then(|raw| parse_completed(raw, tz));

        let category = properties[names.category.as_str()]["select"]["name"]
            .as_str()
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Self {
            minutes,
            completed_on,
            category,
        }
    }
}

/// Notion dates are either `YYYY-MM-DD` or a full RFC 3339 timestamp; the
/// latter is converted to the relay's time zone before taking the date.
pub fn parse_completed(raw: &str, tz: Tz) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&tz).date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

impl KpiSummary {
    pub fn fold<'a>(records: impl IntoIterator<Item = &'a TimeRecord>, windows: &KpiWindows) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.add(record, windows);
        }
        summary
    }

    /// Adds one record to whichever windows contain its completion date.
    pub fn add(&mut self, record: &TimeRecord, windows: &KpiWindows) {
        let (Some(minutes), Some(completed_on)) = (record.minutes, record.completed_on) else {
            return;
        };
        if minutes == 0 {
            return;
        }

        if completed_on >= windows.week_start {
            self.total_week_minutes = self.total_week_minutes.saturating_add(minutes);
            if let Some(category) = &record.category {
                let total = self
                    .category_week_minutes
                    .entry(category.clone())
                    .or_insert(0);
                *total = total.saturating_add(minutes);
            }
        }
        if completed_on >= windows.month_start {
            self.total_month_minutes = self.total_month_minutes.saturating_add(minutes);
        }
    }
}

/// Query filter: time recorded and completed inside the lookback window.
pub fn query_filter(names: &PropertyNames, windows: &KpiWindows) -> Value {
    let mut time_condition = names.time_kind.is_not_empty();
    time_condition["property"] = json!(names.time);
    json!({
        "and": [
            time_condition,
            {
                "property": names.completed,
                "date": { "on_or_after": windows.lookback_start.format("%Y-%m-%d").to_string() }
            }
        ]
    })
}
