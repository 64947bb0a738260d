//! Denormalized version summary cached on a prompt.
//!
//! The summary is always rebuilt from the full set of the prompt's versions
//! rather than patched incrementally, so recomputing it is idempotent.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::Timestamp;
use crate::versioning::{latest_marker, VersionMarker};

/// `current_version` / `total_versions` / `last_version_time` as stored on
/// the prompt row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptVersionSummary {
    /// Highest version number, or `None` when no versions remain.
    pub current_version: Option<String>,
    pub total_versions: i32,
    /// Creation time of the newest version.
    pub last_version_time: Option<Timestamp>,
}

/// Recompute the summary from every remaining version of a prompt.
///
/// An empty slice clears the summary. Fails if any stored version number is
/// malformed.
pub fn summarize(markers: &[VersionMarker]) -> Result<PromptVersionSummary, CoreError> {
    let current_version = latest_marker(markers)?.map(|(_, number)| number.to_string());
    let last_version_time = markers.iter().map(|m| m.create_time).max();
    let total_versions = i32::try_from(markers.len())
        .map_err(|_| CoreError::Internal("Version count exceeds i32".to_string()))?;

    Ok(PromptVersionSummary {
        current_version,
        total_versions,
        last_version_time,
    })
}
