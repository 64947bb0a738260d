//! Prompt models.
//!
//! The prompt row is owned by the wider application; this crate reads its
//! content fields and maintains its denormalized version summary.

use serde::Serialize;
use sqlx::FromRow;
use yprompt_core::types::{DbId, Timestamp};
use yprompt_core::version_diff::Snapshot;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `prompts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Prompt {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub final_prompt: String,
    pub tags: Vec<String>,
    pub current_version: Option<String>,
    pub total_versions: i32,
    pub last_version_time: Option<Timestamp>,
    pub create_time: Timestamp,
    pub update_time: Timestamp,
}

impl Prompt {
    /// The content that a new version snapshots.
    pub fn content(&self) -> PromptContent {
        PromptContent {
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            final_prompt: self.final_prompt.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// The user-facing content fields shared by prompts and their versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContent {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub final_prompt: String,
}

impl PromptContent {
    pub fn as_snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            title: &self.title,
            description: self.description.as_deref(),
            tags: &self.tags,
            final_prompt: &self.final_prompt,
        }
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for inserting a new prompt.
#[derive(Debug, Clone)]
pub struct CreatePrompt {
    pub user_id: DbId,
    pub content: PromptContent,
}
