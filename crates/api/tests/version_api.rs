//! HTTP-level integration tests for the prompt version endpoints.
//!
//! Prompts are created through `POST /api/v1/prompts` so each test drives the
//! same path a client would.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, delete, get_auth, post_empty, post_json, put_json, token_for,
};
use serde_json::{json, Value};
use sqlx::PgPool;

const OWNER: i64 = 11;
const STRANGER: i64 = 12;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Save a new prompt and return `(prompt_id, first_version_id)`.
async fn create_prompt(pool: &PgPool, text: &str) -> (i64, i64) {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/prompts",
        &token_for(OWNER),
        json!({
            "title": "Translator",
            "description": "EN to FR",
            "final_prompt": text,
            "tags": ["i18n"],
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["version"]["version_number"], "1.0.0");
    (
        json["data"]["prompt"]["id"].as_i64().unwrap(),
        json["data"]["version"]["version_id"].as_i64().unwrap(),
    )
}

async fn update_prompt(pool: &PgPool, prompt_id: i64, text: &str, create_version: bool) -> Value {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/prompts",
        &token_for(OWNER),
        json!({
            "id": prompt_id,
            "title": "Translator",
            "final_prompt": text,
            "tags": ["i18n"],
            "create_version": create_version,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn create_version(pool: &PgPool, prompt_id: i64, change_type: &str) -> Value {
    let response = post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}"),
        &token_for(OWNER),
        json!({ "change_type": change_type, "change_summary": format!("{change_type} change") }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_version_lifecycle_over_http(pool: PgPool) {
    let (prompt_id, v1_id) = create_prompt(&pool, "Translate to French.").await;

    update_prompt(&pool, prompt_id, "Translate to formal French.", false).await;
    let minor = create_version(&pool, prompt_id, "minor").await;
    assert_eq!(minor["data"]["version_number"], "1.1.0");

    let saved = update_prompt(&pool, prompt_id, "Translate to formal French!", true).await;
    assert_eq!(saved["data"]["version"]["version_number"], "1.1.1");
    assert_eq!(saved["data"]["prompt"]["current_version"], "1.1.1");
    assert_eq!(saved["data"]["prompt"]["total_versions"], 3);

    let response = post_empty(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/{v1_id}/rollback"),
        &token_for(OWNER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["new_version"], "1.1.2");
    assert_eq!(json["data"]["rollback_to_version"], "1.0.0");
    let rollback_id = json["data"]["version_id"].as_i64().unwrap();

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/{rollback_id}"),
        &token_for(OWNER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["final_prompt"], "Translate to French.");
    assert_eq!(json["data"]["change_type"], "patch");
    assert_eq!(json["data"]["version_tag"], "draft");
    assert_eq!(json["data"]["parent_version_id"], v1_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rollback_with_custom_summary(pool: PgPool) {
    let (prompt_id, v1_id) = create_prompt(&pool, "text").await;

    let response = post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/{v1_id}/rollback"),
        &token_for(OWNER),
        json!({ "change_summary": "Revert experiment" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let version_id = json["data"]["version_id"].as_i64().unwrap();

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/{version_id}"),
        &token_for(OWNER),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["change_summary"], "Revert experiment");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_history_listing_with_paging_and_tag(pool: PgPool) {
    let (prompt_id, v1_id) = create_prompt(&pool, "text").await;
    create_version(&pool, prompt_id, "patch").await;
    create_version(&pool, prompt_id, "patch").await;

    let response = put_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/{v1_id}/tag"),
        &token_for(OWNER),
        json!({ "version_tag": "stable" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["version_tag"], "stable");

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions?page=1&limit=2"),
        &token_for(OWNER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["total"], 3);
    assert_eq!(json["data"]["page"], 1);
    assert_eq!(json["data"]["limit"], 2);
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["version_number"], "1.0.2");

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions?tag=stable"),
        &token_for(OWNER),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["items"][0]["id"], v1_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_compare_endpoint(pool: PgPool) {
    let (prompt_id, v1_id) = create_prompt(&pool, "alpha\nbeta").await;
    let saved = update_prompt(&pool, prompt_id, "alpha\ngamma", true).await;
    let v2_id = saved["data"]["version"]["version_id"].as_i64().unwrap();

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/compare?from={v1_id}&to={v2_id}"),
        &token_for(OWNER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["from_version"]["version_number"], "1.0.0");
    assert_eq!(json["data"]["to_version"]["version_number"], "1.0.1");
    assert_eq!(json["data"]["diff"]["inserted_lines"], 1);
    assert_eq!(json["data"]["diff"]["removed_lines"], 1);
    assert_eq!(json["data"]["diff"]["unchanged_lines"], 1);

    // The update dropped the description.
    let changes = json["data"]["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["field"], "description");

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/compare?from={v1_id}&to={v1_id}"),
        &token_for(OWNER),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["changes"].as_array().unwrap().len(), 0);
    assert_eq!(json["data"]["diff"]["inserted_lines"], 0);
    assert_eq!(json["data"]["diff"]["removed_lines"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_record_use(pool: PgPool) {
    let (prompt_id, v1_id) = create_prompt(&pool, "text").await;
    let uri = format!("/api/v1/versions/{prompt_id}/versions/{v1_id}/use");

    post_empty(build_test_app(pool.clone()), &uri, &token_for(OWNER)).await;
    let response = post_empty(build_test_app(pool.clone()), &uri, &token_for(OWNER)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["use_count"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_guards_last_version(pool: PgPool) {
    let (prompt_id, v1_id) = create_prompt(&pool, "text").await;

    let response = delete(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/{v1_id}"),
        &token_for(OWNER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVARIANT_VIOLATION");

    let second = create_version(&pool, prompt_id, "minor").await;
    let second_id = second["data"]["version_id"].as_i64().unwrap();

    let response = delete(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/{second_id}"),
        &token_for(OWNER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/{second_id}"),
        &token_for(OWNER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_non_owner_sees_not_found(pool: PgPool) {
    let (prompt_id, v1_id) = create_prompt(&pool, "text").await;

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/versions/{prompt_id}/versions/{v1_id}"),
        &token_for(STRANGER),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/prompts",
        &token_for(STRANGER),
        json!({ "id": prompt_id, "title": "Hijack", "final_prompt": "mine now" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_prompt_requires_content(pool: PgPool) {
    let response = post_json(
        build_test_app(pool),
        "/api/v1/prompts",
        &token_for(OWNER),
        json!({ "title": "Empty", "final_prompt": "" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_save_with_stale_id_creates_prompt(pool: PgPool) {
    let response = post_json(
        build_test_app(pool),
        "/api/v1/prompts",
        &token_for(OWNER),
        json!({ "id": 777_777, "title": "Recovered", "final_prompt": "from a stale tab" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["created"], true);
    assert_ne!(json["data"]["prompt"]["id"], 777_777);
    assert_eq!(json["data"]["version"]["version_number"], "1.0.0");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_prompt_at_length_limit_is_saved(pool: PgPool) {
    let (prompt_id, _) = create_prompt(&pool, "short").await;
    let text = "词".repeat(10_000);

    let saved = update_prompt(&pool, prompt_id, &text, true).await;
    assert_eq!(saved["data"]["created"], false);
    assert_eq!(saved["data"]["version"]["version_number"], "1.0.1");
    assert_eq!(saved["data"]["prompt"]["final_prompt"], text.as_str());
}
