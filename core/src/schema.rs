use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::config::{NotionRevision, PropertyNames};

/// Result of resolving a container into its first queryable source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredSource {
    pub source_id: String,
    /// Options of the category select property, in schema order
    pub categories: Vec<String>,
    /// Options of the department multi-select property, in schema order
    pub departments: Vec<String>,
}

impl DiscoveredSource {
    /// Reads the configured option lists out of a source's schema payload.
    /// Schema drift never fails discovery; it just yields empty lists.
    pub fn from_schema(source_id: impl Into<String>, schema: &Value, names: &PropertyNames) -> Self {
        let properties = &schema["properties"];
        Self {
            source_id: source_id.into(),
            categories: select_options(properties, &names.category, "select"),
            departments: select_options(properties, &names.department, "multi_select"),
        }
    }
}

/// Queryable source ids of a container, in upstream order.
///
/// Under the legacy revision the container is its own (single) source.
pub fn source_ids(container: &Value, container_id: &str, revision: NotionRevision) -> Vec<String> {
    match revision {
        NotionRevision::Legacy => vec![container_id.to_string()],
        NotionRevision::DataSources => container["data_sources"]
            .as_array()
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|source| source["id"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Option names of a `select`/`multi_select` property. Missing property,
/// a different property type, or malformed options all give an empty list.
pub fn select_options(properties: &Value, name: &str, kind: &str) -> Vec<String> {
    let property = &properties[name];
    if let Some(actual) = property["type"].as_str() {
        if actual != kind {
            return Vec::new();
        }
    }
    property[kind]["options"]
        .as_array()
        .map(|options| {
            options
                .iter()
                .filter_map(|option| option["name"].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
