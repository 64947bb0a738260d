//! Version lifecycle operations over the prompt and version tables.
//!
//! Every mutation runs in a single transaction that first locks the owning
//! prompt row, so concurrent writers for the same prompt are serialized and
//! the cached summary on the prompt always matches the committed versions.
//! The `(prompt_id, version_number)` unique constraint backs this up; a
//! collision is retried a bounded number of times before giving up.

use std::future::Future;

use sqlx::PgConnection;
use yprompt_core::error::CoreError;
use yprompt_core::pagination::{clamp_limit, clamp_page, page_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use yprompt_core::summary::summarize;
use yprompt_core::types::DbId;
use yprompt_core::version_diff::compare_snapshots;
use yprompt_core::versioning::{
    latest_marker, next_version_number, rollback_summary, validate_change_log,
    validate_change_summary, validate_final_prompt, ChangeType, VersionTag,
};
use yprompt_db::models::prompt::{CreatePrompt, Prompt, PromptContent};
use yprompt_db::models::prompt_version::{CreatePromptVersion, PromptVersion};
use yprompt_db::repositories::prompt_version_repo::is_version_number_conflict;
use yprompt_db::repositories::{PromptRepo, PromptVersionRepo};
use yprompt_db::DbPool;

use crate::types::{
    CreatedVersion, HistoryQuery, NewVersion, RollbackOutcome, SavePrompt, SavedPrompt,
    VersionComparison, VersionPage,
};

/// Default number of attempts when a version number collides.
pub const DEFAULT_MAX_CREATE_ATTEMPTS: u32 = 3;

/// Summary recorded on the first version of a newly saved prompt.
pub const INITIAL_VERSION_SUMMARY: &str = "初始版本";

/// Summary recorded when saving an existing prompt creates a version.
pub const UPDATE_VERSION_SUMMARY: &str = "更新提示词";

#[derive(Debug, Clone)]
pub struct VersionManagerConfig {
    /// Attempts per create/rollback before a number collision is reported.
    pub max_create_attempts: u32,
}

impl Default for VersionManagerConfig {
    fn default() -> Self {
        Self {
            max_create_attempts: DEFAULT_MAX_CREATE_ATTEMPTS,
        }
    }
}

/// Stateless service over a connection pool. Cheap to clone.
#[derive(Clone)]
pub struct VersionManager {
    pool: DbPool,
    config: VersionManagerConfig,
}

/// Failure inside a unit of work, before it is mapped to a [`CoreError`].
enum TxError {
    Domain(CoreError),
    Store(sqlx::Error),
}

impl From<CoreError> for TxError {
    fn from(err: CoreError) -> Self {
        TxError::Domain(err)
    }
}

impl From<sqlx::Error> for TxError {
    fn from(err: sqlx::Error) -> Self {
        TxError::Store(err)
    }
}

/// Fields for the next version of a prompt; the number is computed at insert.
struct VersionDraft {
    prompt_id: DbId,
    created_by: DbId,
    content: PromptContent,
    change_type: ChangeType,
    change_summary: String,
    change_log: Option<String>,
    version_tag: VersionTag,
    /// Overrides the default parent (the current latest version).
    parent_version_id: Option<DbId>,
}

impl VersionManager {
    pub fn new(pool: DbPool, config: VersionManagerConfig) -> Self {
        Self { pool, config }
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Snapshot the prompt's current content as a new version.
    pub async fn create_version(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        input: NewVersion,
    ) -> Result<CreatedVersion, CoreError> {
        validate_change_summary(&input.change_summary)?;
        if let Some(log) = &input.change_log {
            validate_change_log(log)?;
        }

        let input = &input;
        let created = self
            .with_number_retry("create_version", prompt_id, user_id, move || {
                self.try_create(prompt_id, user_id, input)
            })
            .await?;

        tracing::info!(
            prompt_id,
            user_id,
            version_id = created.version_id,
            version_number = %created.version_number,
            change_type = %input.change_type,
            "Prompt version created"
        );
        Ok(created)
    }

    /// Page through a prompt's versions, newest first.
    pub async fn get_version_history(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        query: HistoryQuery,
    ) -> Result<VersionPage, CoreError> {
        let result = self.load_history(prompt_id, user_id, &query).await;
        self.finish("get_version_history", prompt_id, user_id, result)
    }

    /// Full record of one version.
    pub async fn get_version_detail(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        version_id: DbId,
    ) -> Result<PromptVersion, CoreError> {
        let result = self.load_detail(prompt_id, user_id, version_id).await;
        self.finish("get_version_detail", prompt_id, user_id, result)
    }

    /// Field and content differences going from one version to another.
    pub async fn compare_versions(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        from_version_id: DbId,
        to_version_id: DbId,
    ) -> Result<VersionComparison, CoreError> {
        let result = self
            .load_comparison(prompt_id, user_id, from_version_id, to_version_id)
            .await;
        self.finish("compare_versions", prompt_id, user_id, result)
    }

    /// Append a patch version carrying the target's content and make that
    /// content the prompt's working copy again. Nothing is deleted.
    pub async fn rollback_to_version(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        version_id: DbId,
        change_summary: Option<String>,
    ) -> Result<RollbackOutcome, CoreError> {
        if let Some(summary) = &change_summary {
            validate_change_summary(summary)?;
        }

        let change_summary = change_summary.as_deref();
        let outcome = self
            .with_number_retry("rollback_to_version", prompt_id, user_id, move || {
                self.try_rollback(prompt_id, user_id, version_id, change_summary)
            })
            .await?;

        tracing::info!(
            prompt_id,
            user_id,
            version_id = outcome.version_id,
            new_version = %outcome.new_version,
            rollback_to_version = %outcome.rollback_to_version,
            "Prompt rolled back"
        );
        Ok(outcome)
    }

    /// Replace the release tag of a version.
    pub async fn update_version_tag(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        version_id: DbId,
        tag: VersionTag,
    ) -> Result<PromptVersion, CoreError> {
        let result = self.apply_tag(prompt_id, user_id, version_id, tag).await;
        let version = self.finish("update_version_tag", prompt_id, user_id, result)?;

        tracing::info!(
            prompt_id,
            user_id,
            version_id,
            version_tag = %version.version_tag,
            "Prompt version tag updated"
        );
        Ok(version)
    }

    /// Bump the use counter of a version.
    pub async fn record_version_use(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        version_id: DbId,
    ) -> Result<PromptVersion, CoreError> {
        let result = self.bump_use_count(prompt_id, user_id, version_id).await;
        self.finish("record_version_use", prompt_id, user_id, result)
    }

    /// Permanently remove a version. The last remaining version of a prompt
    /// cannot be deleted.
    pub async fn delete_version(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        version_id: DbId,
    ) -> Result<(), CoreError> {
        let result = self.try_delete(prompt_id, user_id, version_id).await;
        self.finish("delete_version", prompt_id, user_id, result)?;

        tracing::info!(prompt_id, user_id, version_id, "Prompt version deleted");
        Ok(())
    }

    /// Create or update a prompt, optionally recording a version of the
    /// saved content in the same transaction.
    ///
    /// A new prompt gets a `major` version, an update gets a `patch`. An `id`
    /// that no longer exists creates a new prompt under a fresh id.
    pub async fn save_prompt(
        &self,
        user_id: DbId,
        input: SavePrompt,
    ) -> Result<SavedPrompt, CoreError> {
        validate_content(&input.content)?;
        if let Some(summary) = &input.change_summary {
            validate_change_summary(summary)?;
        }

        let prompt_id = input.id.unwrap_or_default();
        let input = &input;
        let saved = self
            .with_number_retry("save_prompt", prompt_id, user_id, move || {
                self.try_save(user_id, input)
            })
            .await?;

        tracing::info!(
            prompt_id = saved.prompt.id,
            user_id,
            requested_id = input.id,
            created = saved.created,
            version_number = saved.version.as_ref().map(|v| v.version_number.as_str()),
            "Prompt saved"
        );
        Ok(saved)
    }

    // -----------------------------------------------------------------------
    // Units of work
    // -----------------------------------------------------------------------

    async fn try_create(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        input: &NewVersion,
    ) -> Result<CreatedVersion, TxError> {
        let mut tx = self.pool.begin().await?;
        let prompt = lock_prompt(&mut tx, prompt_id, user_id).await?;
        validate_final_prompt(&prompt.final_prompt)?;

        let version = insert_next_version(
            &mut tx,
            VersionDraft {
                prompt_id,
                created_by: user_id,
                content: prompt.content(),
                change_type: input.change_type,
                change_summary: input.change_summary.clone(),
                change_log: input.change_log.clone(),
                version_tag: input.version_tag.unwrap_or_default(),
                parent_version_id: None,
            },
        )
        .await?;
        refresh_summary(&mut tx, prompt_id).await?;

        tx.commit().await?;
        Ok(CreatedVersion::from(&version))
    }

    async fn try_rollback(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        version_id: DbId,
        change_summary: Option<&str>,
    ) -> Result<RollbackOutcome, TxError> {
        let mut tx = self.pool.begin().await?;
        lock_prompt(&mut tx, prompt_id, user_id).await?;

        let target = PromptVersionRepo::find_for_prompt(&mut *tx, prompt_id, version_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "PromptVersion",
                id: version_id,
            })?;
        let content = target.content();

        let version = insert_next_version(
            &mut tx,
            VersionDraft {
                prompt_id,
                created_by: user_id,
                content: content.clone(),
                change_type: ChangeType::Patch,
                change_summary: change_summary
                    .map(str::to_string)
                    .unwrap_or_else(|| rollback_summary(&target.version_number)),
                change_log: None,
                version_tag: VersionTag::Draft,
                parent_version_id: Some(target.id),
            },
        )
        .await?;

        PromptRepo::update_content(&mut *tx, prompt_id, user_id, &content).await?;
        refresh_summary(&mut tx, prompt_id).await?;

        tx.commit().await?;
        Ok(RollbackOutcome {
            version_id: version.id,
            new_version: version.version_number,
            rollback_to_version: target.version_number,
        })
    }

    async fn try_delete(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        version_id: DbId,
    ) -> Result<(), TxError> {
        let mut tx = self.pool.begin().await?;
        lock_prompt(&mut tx, prompt_id, user_id).await?;

        if PromptVersionRepo::find_for_prompt(&mut *tx, prompt_id, version_id)
            .await?
            .is_none()
        {
            return Err(CoreError::NotFound {
                entity: "PromptVersion",
                id: version_id,
            }
            .into());
        }

        let markers = PromptVersionRepo::list_markers(&mut *tx, prompt_id).await?;
        if markers.len() <= 1 {
            return Err(CoreError::InvariantViolation(
                "Cannot delete the only remaining version of a prompt".to_string(),
            )
            .into());
        }

        PromptVersionRepo::delete(&mut *tx, prompt_id, version_id).await?;
        refresh_summary(&mut tx, prompt_id).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn try_save(&self, user_id: DbId, input: &SavePrompt) -> Result<SavedPrompt, TxError> {
        let mut tx = self.pool.begin().await?;

        // The UPDATE takes the row lock that guards numbering below. An id
        // that matches no prompt at all is saved as a new prompt; one owned by
        // someone else is hidden behind `NotFound`.
        let existing = match input.id {
            Some(id) => {
                let updated = PromptRepo::update_content(&mut *tx, id, user_id, &input.content).await?;
                if updated.is_none() && PromptRepo::exists(&mut *tx, id).await? {
                    return Err(prompt_not_found(id));
                }
                updated
            }
            None => None,
        };
        let created = existing.is_none();
        let (prompt, change_type, default_summary) = match existing {
            Some(prompt) => (prompt, ChangeType::Patch, UPDATE_VERSION_SUMMARY),
            None => {
                let prompt = PromptRepo::create(
                    &mut *tx,
                    &CreatePrompt {
                        user_id,
                        content: input.content.clone(),
                    },
                )
                .await?;
                (prompt, ChangeType::Major, INITIAL_VERSION_SUMMARY)
            }
        };

        if !input.create_version {
            tx.commit().await?;
            return Ok(SavedPrompt {
                prompt,
                version: None,
                created,
            });
        }

        let version = insert_next_version(
            &mut tx,
            VersionDraft {
                prompt_id: prompt.id,
                created_by: user_id,
                content: prompt.content(),
                change_type,
                change_summary: input
                    .change_summary
                    .clone()
                    .unwrap_or_else(|| default_summary.to_string()),
                change_log: None,
                version_tag: VersionTag::Draft,
                parent_version_id: None,
            },
        )
        .await?;
        refresh_summary(&mut tx, prompt.id).await?;

        let prompt = PromptRepo::find_owned(&mut *tx, prompt.id, user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Prompt",
                id: prompt.id,
            })?;

        tx.commit().await?;
        Ok(SavedPrompt {
            prompt,
            version: Some(CreatedVersion::from(&version)),
            created,
        })
    }

    async fn load_history(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        query: &HistoryQuery,
    ) -> Result<VersionPage, TxError> {
        self.ensure_owned(prompt_id, user_id).await?;

        let limit = clamp_limit(query.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
        let page = clamp_page(query.page);
        let total = PromptVersionRepo::count_for_prompt(&self.pool, prompt_id, query.tag).await?;
        let items = PromptVersionRepo::list_for_prompt(
            &self.pool,
            prompt_id,
            query.tag,
            limit,
            page_offset(page, limit),
        )
        .await?;

        Ok(VersionPage {
            total,
            page,
            limit,
            items,
        })
    }

    async fn load_detail(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        version_id: DbId,
    ) -> Result<PromptVersion, TxError> {
        self.ensure_owned(prompt_id, user_id).await?;
        self.find_version(prompt_id, version_id).await
    }

    async fn load_comparison(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        from_version_id: DbId,
        to_version_id: DbId,
    ) -> Result<VersionComparison, TxError> {
        self.ensure_owned(prompt_id, user_id).await?;
        let from = self.find_version(prompt_id, from_version_id).await?;
        let to = self.find_version(prompt_id, to_version_id).await?;

        // The line diff is quadratic in the differing lines; keep it off the
        // async workers.
        let comparison = tokio::task::spawn_blocking(move || {
            compare_snapshots(&from.as_snapshot(), &to.as_snapshot()).map(|diff| VersionComparison {
                from_version: from.brief(),
                to_version: to.brief(),
                changes: diff.changes,
                diff: diff.diff,
            })
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, prompt_id, user_id, "Version comparison task failed");
            CoreError::Internal("compare_versions failed".to_string())
        })??;
        Ok(comparison)
    }

    async fn apply_tag(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        version_id: DbId,
        tag: VersionTag,
    ) -> Result<PromptVersion, TxError> {
        self.ensure_owned(prompt_id, user_id).await?;
        PromptVersionRepo::update_tag(&self.pool, prompt_id, version_id, tag)
            .await?
            .ok_or_else(|| version_not_found(version_id))
    }

    async fn bump_use_count(
        &self,
        prompt_id: DbId,
        user_id: DbId,
        version_id: DbId,
    ) -> Result<PromptVersion, TxError> {
        self.ensure_owned(prompt_id, user_id).await?;
        PromptVersionRepo::increment_use_count(&self.pool, prompt_id, version_id)
            .await?
            .ok_or_else(|| version_not_found(version_id))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Missing and foreign prompts both surface as `NotFound`.
    async fn ensure_owned(&self, prompt_id: DbId, user_id: DbId) -> Result<Prompt, TxError> {
        PromptRepo::find_owned(&self.pool, prompt_id, user_id)
            .await?
            .ok_or_else(|| prompt_not_found(prompt_id))
    }

    async fn find_version(&self, prompt_id: DbId, version_id: DbId) -> Result<PromptVersion, TxError> {
        PromptVersionRepo::find_for_prompt(&self.pool, prompt_id, version_id)
            .await?
            .ok_or_else(|| version_not_found(version_id))
    }

    /// Run `attempt` until it succeeds, fails for a reason other than a
    /// version number collision, or the configured attempts are used up.
    async fn with_number_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        prompt_id: DbId,
        user_id: DbId,
        mut attempt: F,
    ) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TxError>>,
    {
        let max_attempts = self.config.max_create_attempts.max(1);
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(TxError::Store(err)) if is_version_number_conflict(&err) => {
                    if tries >= max_attempts {
                        tracing::warn!(
                            prompt_id,
                            user_id,
                            operation,
                            attempts = tries,
                            "Version number still taken after final attempt"
                        );
                        return Err(CoreError::InvariantViolation(format!(
                            "Could not allocate a unique version number after {tries} attempts"
                        )));
                    }
                    tracing::warn!(prompt_id, operation, attempt = tries, "Version number taken, retrying");
                    tries += 1;
                }
                other => return self.finish(operation, prompt_id, user_id, other),
            }
        }
    }

    /// Map a unit-of-work result to the public error type, logging store
    /// failures with their context.
    fn finish<T>(
        &self,
        operation: &'static str,
        prompt_id: DbId,
        user_id: DbId,
        result: Result<T, TxError>,
    ) -> Result<T, CoreError> {
        result.map_err(|err| match err {
            TxError::Domain(err) => err,
            TxError::Store(err) => {
                tracing::error!(error = %err, prompt_id, user_id, operation, "Version store failure");
                CoreError::Internal(format!("{operation} failed"))
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Transaction steps
// ---------------------------------------------------------------------------

async fn lock_prompt(conn: &mut PgConnection, prompt_id: DbId, user_id: DbId) -> Result<Prompt, TxError> {
    PromptRepo::lock_owned(&mut *conn, prompt_id, user_id)
        .await?
        .ok_or_else(|| prompt_not_found(prompt_id))
}

/// Number and insert the next version. The caller must hold the prompt lock.
async fn insert_next_version(conn: &mut PgConnection, draft: VersionDraft) -> Result<PromptVersion, TxError> {
    let markers = PromptVersionRepo::list_markers(&mut *conn, draft.prompt_id).await?;
    let latest = latest_marker(&markers)?;
    let number = next_version_number(latest.map(|(_, number)| number), draft.change_type)?;
    let parent_version_id = draft
        .parent_version_id
        .or_else(|| latest.map(|(marker, _)| marker.id));

    let version = PromptVersionRepo::create(
        &mut *conn,
        &CreatePromptVersion {
            prompt_id: draft.prompt_id,
            version_number: number.to_string(),
            version_tag: draft.version_tag,
            change_type: draft.change_type,
            content: draft.content,
            change_log: draft.change_log,
            change_summary: draft.change_summary,
            parent_version_id,
            created_by: draft.created_by,
        },
    )
    .await?;
    Ok(version)
}

/// Rebuild the prompt's cached summary from its remaining versions.
async fn refresh_summary(conn: &mut PgConnection, prompt_id: DbId) -> Result<(), TxError> {
    let markers = PromptVersionRepo::list_markers(&mut *conn, prompt_id).await?;
    let summary = summarize(&markers)?;
    PromptRepo::apply_version_summary(&mut *conn, prompt_id, &summary).await?;
    Ok(())
}

fn validate_content(content: &PromptContent) -> Result<(), CoreError> {
    if content.title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".to_string()));
    }
    validate_final_prompt(&content.final_prompt)
}

fn prompt_not_found(id: DbId) -> TxError {
    CoreError::NotFound { entity: "Prompt", id }.into()
}

fn version_not_found(id: DbId) -> TxError {
    CoreError::NotFound {
        entity: "PromptVersion",
        id,
    }
    .into()
}
