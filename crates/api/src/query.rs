//! Query parameter types for the version endpoints.

use serde::Deserialize;
use yprompt_core::types::DbId;

/// `?page=&limit=&tag=` for version history.
///
/// `tag` stays a raw string here so an unknown value is reported as a
/// validation error rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct VersionListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub tag: Option<String>,
}

/// `?from=&to=` for version comparison.
#[derive(Debug, Deserialize)]
pub struct CompareParams {
    #[serde(rename = "from")]
    pub from_version_id: DbId,
    #[serde(rename = "to")]
    pub to_version_id: DbId,
}
