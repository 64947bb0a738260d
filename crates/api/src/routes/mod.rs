pub mod health;
pub mod prompts;
pub mod versions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /prompts     save_prompt
/// /versions    version lifecycle (see routes::versions)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/prompts", prompts::router())
        .nest("/versions", versions::router())
}
