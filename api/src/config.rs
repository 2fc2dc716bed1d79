use chrono_tz::Tz;
use worklog_core::config::{
    DEFAULT_KPI_LOOKBACK_DAYS, DEFAULT_NOTION_API_BASE, DEFAULT_TOGGL_API_BASE,
    DEFAULT_TOGGL_CREATED_WITH, NotionRevision, PropertyNames, TimeKind, TimeUnit,
};

/// Provider hosts the generic relay may reach unless `RELAY_ALLOWED_HOSTS` says otherwise.
const DEFAULT_ALLOWED_HOSTS: &[&str] = &["api.notion.com", "api.track.toggl.com"];

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Startup configuration. Immutable once the server is running.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub notion_api_base: String,
    pub notion_revision: NotionRevision,
    pub toggl_api_base: String,
    pub toggl_created_with: String,
    pub properties: PropertyNames,
    pub kpi_lookback_days: u32,
    pub timezone: Tz,
    /// `None` lets the relay reach any host.
    pub allowed_hosts: Option<Vec<String>>,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            notion_api_base: DEFAULT_NOTION_API_BASE.to_string(),
            notion_revision: NotionRevision::default(),
            toggl_api_base: DEFAULT_TOGGL_API_BASE.to_string(),
            toggl_created_with: DEFAULT_TOGGL_CREATED_WITH.to_string(),
            properties: PropertyNames::default(),
            kpi_lookback_days: DEFAULT_KPI_LOOKBACK_DAYS,
            timezone: Tz::UTC,
            allowed_hosts: Some(
                DEFAULT_ALLOWED_HOSTS
                    .iter()
                    .map(|host| host.to_string())
                    .collect(),
            ),
            port: DEFAULT_PORT,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(base) = var("NOTION_API_BASE") {
            config.notion_api_base = base_url("NOTION_API_BASE", &base)?;
        }
        if let Some(version) = var("NOTION_VERSION") {
            config.notion_revision =
                NotionRevision::parse(&version).ok_or_else(|| ConfigError::Invalid {
                    var: "NOTION_VERSION",
                    value: version.clone(),
                    reason: "supported revisions are 2022-06-28 and 2025-09-03".to_string(),
                })?;
        }
        if let Some(base) = var("TOGGL_API_BASE") {
            config.toggl_api_base = base_url("TOGGL_API_BASE", &base)?;
        }
        if let Some(tag) = var("TOGGL_CREATED_WITH") {
            config.toggl_created_with = tag;
        }

        if let Some(name) = var("NOTION_CATEGORY_PROPERTY") {
            config.properties.category = name;
        }
        if let Some(name) = var("NOTION_DEPARTMENT_PROPERTY") {
            config.properties.department = name;
        }
        if let Some(name) = var("NOTION_TIME_PROPERTY") {
            config.properties.time = name;
        }
        if let Some(kind) = var("NOTION_TIME_PROPERTY_KIND") {
            config.properties.time_kind =
                TimeKind::parse(&kind).ok_or_else(|| ConfigError::Invalid {
                    var: "NOTION_TIME_PROPERTY_KIND",
                    value: kind.clone(),
                    reason: "expected 'formula' or 'number'".to_string(),
                })?;
        }
        if let Some(unit) = var("NOTION_TIME_UNIT") {
            config.properties.time_unit =
                TimeUnit::parse(&unit).ok_or_else(|| ConfigError::Invalid {
                    var: "NOTION_TIME_UNIT",
                    value: unit.clone(),
                    reason: "expected 'hours' or 'minutes'".to_string(),
                })?;
        }
        if let Some(name) = var("NOTION_COMPLETED_PROPERTY") {
            config.properties.completed = name;
        }

        if let Some(days) = var("KPI_LOOKBACK_DAYS") {
            config.kpi_lookback_days = days.parse().map_err(|_| ConfigError::Invalid {
                var: "KPI_LOOKBACK_DAYS",
                value: days.clone(),
                reason: "expected a non-negative integer".to_string(),
            })?;
        }
        if let Some(zone) = var("RELAY_TIMEZONE") {
            config.timezone = zone.parse::<Tz>().map_err(|_| ConfigError::Invalid {
                var: "RELAY_TIMEZONE",
                value: zone.clone(),
                reason: "expected an IANA time zone name".to_string(),
            })?;
        }
        if let Some(hosts) = var("RELAY_ALLOWED_HOSTS") {
            config.allowed_hosts = parse_allowed_hosts(&hosts);
        }
        if let Some(port) = var("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: port.clone(),
                reason: "expected a TCP port number".to_string(),
            })?;
        }

        Ok(config)
    }

    pub fn host_allowed(&self, host: &str) -> bool {
        match &self.allowed_hosts {
            None => true,
            Some(hosts) => hosts.iter().any(|allowed| allowed.eq_ignore_ascii_case(host)),
        }
    }
}

fn base_url(var: &'static str, value: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected an http or https URL".to_string(),
        });
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// `*` disables the allow-list.
fn parse_allowed_hosts(value: &str) -> Option<Vec<String>> {
    if value == "*" {
        return None;
    }
    Some(
        value
            .split(',')
            .map(|host| host.trim().to_lowercase())
            .filter(|host| !host.is_empty())
            .collect(),
    )
}
