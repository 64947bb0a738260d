//! Prompt version models and DTOs.
//!
//! Defines the database row struct for `prompt_versions`, the lighter list
//! projection, and the insert input used by the version manager.

use serde::Serialize;
use sqlx::FromRow;
use yprompt_core::types::{DbId, Timestamp};
use yprompt_core::version_diff::Snapshot;
use yprompt_core::versioning::{ChangeType, VersionTag};

use crate::models::prompt::PromptContent;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A full row from the `prompt_versions` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PromptVersion {
    pub id: DbId,
    pub prompt_id: DbId,
    pub version_number: String,
    #[sqlx(try_from = "String")]
    pub version_tag: VersionTag,
    #[sqlx(try_from = "String")]
    pub change_type: ChangeType,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub final_prompt: String,
    pub change_log: Option<String>,
    pub change_summary: String,
    pub parent_version_id: Option<DbId>,
    pub created_by: DbId,
    pub use_count: i32,
    pub content_size: i32,
    pub create_time: Timestamp,
}

impl PromptVersion {
    pub fn as_snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            title: &self.title,
            description: self.description.as_deref(),
            tags: &self.tags,
            final_prompt: &self.final_prompt,
        }
    }

    /// Copy of the snapshotted content, e.g. to seed a rollback.
    pub fn content(&self) -> PromptContent {
        PromptContent {
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            final_prompt: self.final_prompt.clone(),
        }
    }

    pub fn brief(&self) -> VersionBrief {
        VersionBrief {
            id: self.id,
            version_number: self.version_number.clone(),
            version_tag: self.version_tag,
            change_type: self.change_type,
            title: self.title.clone(),
            change_summary: self.change_summary.clone(),
            created_by: self.created_by,
            create_time: self.create_time,
        }
    }
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// History list entry: everything except the content payload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PromptVersionListItem {
    pub id: DbId,
    pub version_number: String,
    #[sqlx(try_from = "String")]
    pub version_tag: VersionTag,
    #[sqlx(try_from = "String")]
    pub change_type: ChangeType,
    pub change_summary: String,
    pub parent_version_id: Option<DbId>,
    pub created_by: DbId,
    pub content_size: i32,
    pub use_count: i32,
    pub create_time: Timestamp,
}

/// Summary metadata echoed alongside a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionBrief {
    pub id: DbId,
    pub version_number: String,
    pub version_tag: VersionTag,
    pub change_type: ChangeType,
    pub title: String,
    pub change_summary: String,
    pub created_by: DbId,
    pub create_time: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for inserting a new version row. The number is computed by the
/// caller; the repository never derives it.
#[derive(Debug, Clone)]
pub struct CreatePromptVersion {
    pub prompt_id: DbId,
    pub version_number: String,
    pub version_tag: VersionTag,
    pub change_type: ChangeType,
    pub content: PromptContent,
    pub change_log: Option<String>,
    pub change_summary: String,
    pub parent_version_id: Option<DbId>,
    pub created_by: DbId,
}
