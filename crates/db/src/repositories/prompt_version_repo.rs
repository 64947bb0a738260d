//! Repository for the `prompt_versions` table.

use sqlx::PgExecutor;
use yprompt_core::types::DbId;
use yprompt_core::versioning::{VersionMarker, VersionTag};

use crate::models::prompt_version::{CreatePromptVersion, PromptVersion, PromptVersionListItem};

/// Column list for full prompt_versions rows.
const COLUMNS: &str = "id, prompt_id, version_number, version_tag, change_type, title, \
    description, tags, final_prompt, change_log, change_summary, parent_version_id, \
    created_by, use_count, content_size, create_time";

/// Column list for history listings (no content payload).
const LIST_COLUMNS: &str = "id, version_number, version_tag, change_type, change_summary, \
    parent_version_id, created_by, content_size, use_count, create_time";

/// Name of the unique constraint on `(prompt_id, version_number)`.
pub const VERSION_NUMBER_CONSTRAINT: &str = "uq_prompt_versions_prompt_number";

/// Provides insert, lookup, and the few permitted mutations for versions.
pub struct PromptVersionRepo;

impl PromptVersionRepo {
    /// Insert a new version row with a caller-computed number.
    ///
    /// Fails with a unique violation on [`VERSION_NUMBER_CONSTRAINT`] if the
    /// number is already taken for this prompt.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreatePromptVersion,
    ) -> Result<PromptVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO prompt_versions
                (prompt_id, version_number, version_tag, change_type, title, description,
                 tags, final_prompt, change_log, change_summary, parent_version_id, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PromptVersion>(&query)
            .bind(input.prompt_id)
            .bind(&input.version_number)
            .bind(input.version_tag.as_str())
            .bind(input.change_type.as_str())
            .bind(&input.content.title)
            .bind(&input.content.description)
            .bind(&input.content.tags)
            .bind(&input.content.final_prompt)
            .bind(&input.change_log)
            .bind(&input.change_summary)
            .bind(input.parent_version_id)
            .bind(input.created_by)
            .fetch_one(executor)
            .await
    }

    /// Find a version by id, scoped to its prompt. A version belonging to a
    /// different prompt yields `None`.
    pub async fn find_for_prompt<'e, E: PgExecutor<'e>>(
        executor: E,
        prompt_id: DbId,
        id: DbId,
    ) -> Result<Option<PromptVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prompt_versions WHERE id = $1 AND prompt_id = $2"
        );
        sqlx::query_as::<_, PromptVersion>(&query)
            .bind(id)
            .bind(prompt_id)
            .fetch_optional(executor)
            .await
    }

    /// List versions for a prompt, newest first, optionally filtered by tag.
    pub async fn list_for_prompt<'e, E: PgExecutor<'e>>(
        executor: E,
        prompt_id: DbId,
        tag: Option<VersionTag>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PromptVersionListItem>, sqlx::Error> {
        let query = format!(
            "SELECT {LIST_COLUMNS} FROM prompt_versions
             WHERE prompt_id = $1 AND ($2::TEXT IS NULL OR version_tag = $2)
             ORDER BY create_time DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, PromptVersionListItem>(&query)
            .bind(prompt_id)
            .bind(tag.map(|t| t.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// Count versions for a prompt, with the same optional tag filter as
    /// [`list_for_prompt`](Self::list_for_prompt).
    pub async fn count_for_prompt<'e, E: PgExecutor<'e>>(
        executor: E,
        prompt_id: DbId,
        tag: Option<VersionTag>,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM prompt_versions
             WHERE prompt_id = $1 AND ($2::TEXT IS NULL OR version_tag = $2)",
        )
        .bind(prompt_id)
        .bind(tag.map(|t| t.as_str()))
        .fetch_one(executor)
        .await?;
        Ok(row.0)
    }

    /// Id, number, and creation time of every version of a prompt.
    ///
    /// This is the input for numbering and summary recomputation.
    pub async fn list_markers<'e, E: PgExecutor<'e>>(
        executor: E,
        prompt_id: DbId,
    ) -> Result<Vec<VersionMarker>, sqlx::Error> {
        let rows: Vec<(DbId, String, yprompt_core::types::Timestamp)> = sqlx::query_as(
            "SELECT id, version_number, create_time FROM prompt_versions
             WHERE prompt_id = $1
             ORDER BY create_time, id",
        )
        .bind(prompt_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(VersionMarker::from).collect())
    }

    /// Change the tag of a version. Returns `None` if the version does not
    /// belong to the prompt.
    pub async fn update_tag<'e, E: PgExecutor<'e>>(
        executor: E,
        prompt_id: DbId,
        id: DbId,
        tag: VersionTag,
    ) -> Result<Option<PromptVersion>, sqlx::Error> {
        let query = format!(
            "UPDATE prompt_versions SET version_tag = $3
             WHERE id = $1 AND prompt_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PromptVersion>(&query)
            .bind(id)
            .bind(prompt_id)
            .bind(tag.as_str())
            .fetch_optional(executor)
            .await
    }

    /// Increment the use counter of a version.
    pub async fn increment_use_count<'e, E: PgExecutor<'e>>(
        executor: E,
        prompt_id: DbId,
        id: DbId,
    ) -> Result<Option<PromptVersion>, sqlx::Error> {
        let query = format!(
            "UPDATE prompt_versions SET use_count = use_count + 1
             WHERE id = $1 AND prompt_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PromptVersion>(&query)
            .bind(id)
            .bind(prompt_id)
            .fetch_optional(executor)
            .await
    }

    /// Permanently delete a version. Returns `true` if a row was removed.
    pub async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        prompt_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM prompt_versions WHERE id = $1 AND prompt_id = $2")
            .bind(id)
            .bind(prompt_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// True if `err` is a unique violation on [`VERSION_NUMBER_CONSTRAINT`].
pub fn is_version_number_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint() == Some(VERSION_NUMBER_CONSTRAINT)
        }
        _ => false,
    }
}
