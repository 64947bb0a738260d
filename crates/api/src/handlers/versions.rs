//! Handlers for the prompt version lifecycle.
//!
//! Every handler requires an authenticated caller and delegates to the
//! [`VersionManager`](yprompt_versions::VersionManager) in [`AppState`]; the
//! manager enforces ownership, so handlers only parse and shape requests.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use yprompt_core::types::DbId;
use yprompt_core::versioning::{ChangeType, VersionTag};
use yprompt_versions::{HistoryQuery, NewVersion};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::{CompareParams, VersionListParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// API request types
// ---------------------------------------------------------------------------

/// Request body for creating a version of a prompt's current content.
///
/// `change_type` and `version_tag` are parsed into their enums after
/// deserialization so unknown values produce a `VALIDATION_ERROR`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVersionRequest {
    pub change_type: String,
    #[validate(length(min = 1, max = 500))]
    pub change_summary: String,
    #[validate(length(max = 10000))]
    pub change_log: Option<String>,
    pub version_tag: Option<String>,
}

/// Optional request body for a rollback.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RollbackRequest {
    #[validate(length(min = 1, max = 500))]
    pub change_summary: Option<String>,
}

/// Request body for changing a version's tag.
#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    pub version_tag: String,
}

// ---------------------------------------------------------------------------
// POST /versions/{prompt_id}
// ---------------------------------------------------------------------------

/// Snapshot the prompt's current content as a new version.
pub async fn create_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(prompt_id): Path<DbId>,
    Json(body): Json<CreateVersionRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;

    let change_type: ChangeType = body.change_type.parse()?;
    let version_tag = body
        .version_tag
        .as_deref()
        .map(str::parse::<VersionTag>)
        .transpose()?;

    let created = state
        .versions
        .create_version(
            prompt_id,
            auth.user_id,
            NewVersion {
                change_type,
                change_summary: body.change_summary,
                change_log: body.change_log,
                version_tag,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

// ---------------------------------------------------------------------------
// GET /versions/{prompt_id}/versions
// ---------------------------------------------------------------------------

/// List a prompt's versions, newest first, optionally filtered by tag.
pub async fn list_versions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(prompt_id): Path<DbId>,
    Query(params): Query<VersionListParams>,
) -> AppResult<impl IntoResponse> {
    let tag = params
        .tag
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(str::parse::<VersionTag>)
        .transpose()?;

    let page = state
        .versions
        .get_version_history(
            prompt_id,
            auth.user_id,
            HistoryQuery {
                page: params.page,
                limit: params.limit,
                tag,
            },
        )
        .await?;

    tracing::debug!(
        prompt_id,
        count = page.items.len(),
        total = page.total,
        "Listed prompt versions"
    );

    Ok(Json(DataResponse { data: page }))
}

// ---------------------------------------------------------------------------
// GET /versions/{prompt_id}/versions/compare
// ---------------------------------------------------------------------------

/// Compare two versions of the same prompt.
pub async fn compare_versions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(prompt_id): Path<DbId>,
    Query(params): Query<CompareParams>,
) -> AppResult<impl IntoResponse> {
    let comparison = state
        .versions
        .compare_versions(
            prompt_id,
            auth.user_id,
            params.from_version_id,
            params.to_version_id,
        )
        .await?;

    Ok(Json(DataResponse { data: comparison }))
}

// ---------------------------------------------------------------------------
// GET /versions/{prompt_id}/versions/{version_id}
// ---------------------------------------------------------------------------

pub async fn get_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((prompt_id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let version = state
        .versions
        .get_version_detail(prompt_id, auth.user_id, version_id)
        .await?;

    Ok(Json(DataResponse { data: version }))
}

// ---------------------------------------------------------------------------
// POST /versions/{prompt_id}/versions/{version_id}/rollback
// ---------------------------------------------------------------------------

/// Roll the prompt back to a version by appending a new patch version with
/// its content. The body is optional; an empty body uses the default summary.
pub async fn rollback_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((prompt_id, version_id)): Path<(DbId, DbId)>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let request: RollbackRequest = if body.is_empty() {
        RollbackRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid rollback body: {e}")))?
    };
    request.validate()?;

    let outcome = state
        .versions
        .rollback_to_version(prompt_id, auth.user_id, version_id, request.change_summary)
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

// ---------------------------------------------------------------------------
// PUT /versions/{prompt_id}/versions/{version_id}/tag
// ---------------------------------------------------------------------------

pub async fn update_version_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((prompt_id, version_id)): Path<(DbId, DbId)>,
    Json(body): Json<UpdateTagRequest>,
) -> AppResult<impl IntoResponse> {
    let tag: VersionTag = body.version_tag.parse()?;

    let version = state
        .versions
        .update_version_tag(prompt_id, auth.user_id, version_id, tag)
        .await?;

    Ok(Json(DataResponse { data: version }))
}

// ---------------------------------------------------------------------------
// POST /versions/{prompt_id}/versions/{version_id}/use
// ---------------------------------------------------------------------------

/// Record that a version was used (copied or applied by the caller).
pub async fn record_version_use(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((prompt_id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let version = state
        .versions
        .record_version_use(prompt_id, auth.user_id, version_id)
        .await?;

    Ok(Json(DataResponse { data: version }))
}

// ---------------------------------------------------------------------------
// DELETE /versions/{prompt_id}/versions/{version_id}
// ---------------------------------------------------------------------------

pub async fn delete_version(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((prompt_id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    state
        .versions
        .delete_version(prompt_id, auth.user_id, version_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
