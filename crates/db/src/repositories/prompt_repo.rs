//! Repository for the `prompts` table.
//!
//! Only the access paths the version subsystem needs: ownership lookups and
//! an unscoped existence check, row locking, content writes, and the
//! denormalized summary.

use sqlx::PgExecutor;
use yprompt_core::summary::PromptVersionSummary;
use yprompt_core::types::DbId;

use crate::models::prompt::{CreatePrompt, Prompt, PromptContent};

/// Column list for prompts queries.
const COLUMNS: &str = "id, user_id, title, description, final_prompt, tags, \
    current_version, total_versions, last_version_time, create_time, update_time";

/// Provides ownership-scoped access to prompts.
pub struct PromptRepo;

impl PromptRepo {
    /// Insert a new prompt with an empty version summary.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreatePrompt,
    ) -> Result<Prompt, sqlx::Error> {
        let query = format!(
            "INSERT INTO prompts (user_id, title, description, final_prompt, tags)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prompt>(&query)
            .bind(input.user_id)
            .bind(&input.content.title)
            .bind(&input.content.description)
            .bind(&input.content.final_prompt)
            .bind(&input.content.tags)
            .fetch_one(executor)
            .await
    }

    /// Find a prompt only if it is owned by `user_id`.
    ///
    /// A missing prompt and a prompt owned by someone else both yield `None`.
    pub async fn find_owned<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Prompt>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM prompts WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Prompt>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Whether a prompt with this id exists, whoever owns it.
    pub async fn exists<'e, E: PgExecutor<'e>>(executor: E, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM prompts WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    /// Like [`find_owned`](Self::find_owned) but takes a row lock held until
    /// the surrounding transaction ends. Serializes concurrent version writes
    /// on the same prompt.
    pub async fn lock_owned<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Prompt>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prompts WHERE id = $1 AND user_id = $2 FOR UPDATE"
        );
        sqlx::query_as::<_, Prompt>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Overwrite the working content of an owned prompt.
    ///
    /// Returns `None` if the prompt does not exist or is not owned by `user_id`.
    pub async fn update_content<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        user_id: DbId,
        content: &PromptContent,
    ) -> Result<Option<Prompt>, sqlx::Error> {
        let query = format!(
            "UPDATE prompts SET
                title = $3,
                description = $4,
                final_prompt = $5,
                tags = $6,
                update_time = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prompt>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&content.title)
            .bind(&content.description)
            .bind(&content.final_prompt)
            .bind(&content.tags)
            .fetch_optional(executor)
            .await
    }

    /// Store a recomputed version summary on the prompt.
    pub async fn apply_version_summary<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        summary: &PromptVersionSummary,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE prompts SET
                current_version = $2,
                total_versions = $3,
                last_version_time = $4
             WHERE id = $1",
        )
        .bind(id)
        .bind(&summary.current_version)
        .bind(summary.total_versions)
        .bind(summary.last_version_time)
        .execute(executor)
        .await?;
        Ok(())
    }
}
