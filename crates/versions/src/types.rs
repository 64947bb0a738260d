//! Inputs and outputs of [`VersionManager`](crate::VersionManager) operations.

use serde::Serialize;
use yprompt_core::types::{DbId, Timestamp};
use yprompt_core::version_diff::{ContentDiff, FieldChange};
use yprompt_core::versioning::{ChangeType, VersionTag};
use yprompt_db::models::prompt::{Prompt, PromptContent};
use yprompt_db::models::prompt_version::{PromptVersion, PromptVersionListItem, VersionBrief};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Parameters for `create_version`.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub change_type: ChangeType,
    pub change_summary: String,
    pub change_log: Option<String>,
    /// Defaults to [`VersionTag::Draft`] when absent.
    pub version_tag: Option<VersionTag>,
}

/// Paging and filtering for `get_version_history`. Values are clamped by the
/// manager.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub tag: Option<VersionTag>,
}

/// Parameters for `save_prompt`.
#[derive(Debug, Clone)]
pub struct SavePrompt {
    /// Existing prompt to update; `None` creates a new prompt.
    pub id: Option<DbId>,
    pub content: PromptContent,
    pub create_version: bool,
    pub change_summary: Option<String>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CreatedVersion {
    pub version_id: DbId,
    pub version_number: String,
    pub create_time: Timestamp,
}

impl From<&PromptVersion> for CreatedVersion {
    fn from(version: &PromptVersion) -> Self {
        Self {
            version_id: version.id,
            version_number: version.version_number.clone(),
            create_time: version.create_time,
        }
    }
}

/// One page of version history.
#[derive(Debug, Clone, Serialize)]
pub struct VersionPage {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub items: Vec<PromptVersionListItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionComparison {
    pub from_version: VersionBrief,
    pub to_version: VersionBrief,
    pub changes: Vec<FieldChange>,
    pub diff: ContentDiff,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollbackOutcome {
    pub version_id: DbId,
    pub new_version: String,
    pub rollback_to_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedPrompt {
    pub prompt: Prompt,
    pub version: Option<CreatedVersion>,
    /// True when the save inserted a new prompt rather than updating one.
    pub created: bool,
}
