//! Handler for saving a prompt with optional automatic versioning.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use yprompt_core::types::DbId;
use yprompt_db::models::prompt::PromptContent;
use yprompt_versions::SavePrompt;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /prompts`.
///
/// Without `id`, or with an `id` that no longer exists, a new prompt is
/// created; with the id of one of the caller's prompts it is overwritten.
#[derive(Debug, Deserialize, Validate)]
pub struct SavePromptRequest {
    pub id: Option<DbId>,
    #[validate(length(min = 1))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 10000))]
    pub final_prompt: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_create_version")]
    pub create_version: bool,
    #[validate(length(min = 1, max = 500))]
    pub change_summary: Option<String>,
}

fn default_create_version() -> bool {
    true
}

// ---------------------------------------------------------------------------
// POST /prompts
// ---------------------------------------------------------------------------

/// Create or update a prompt; records a version unless `create_version` is
/// false. Responds `201` for a new prompt and `200` for an update.
pub async fn save_prompt(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SavePromptRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;

    let saved = state
        .versions
        .save_prompt(
            auth.user_id,
            SavePrompt {
                id: body.id,
                content: PromptContent {
                    title: body.title,
                    description: body.description,
                    tags: body.tags,
                    final_prompt: body.final_prompt,
                },
                create_version: body.create_version,
                change_summary: body.change_summary,
            },
        )
        .await?;

    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DataResponse { data: saved })))
}
