//! Route definitions for prompt saving.
//!
//! ```text
//! POST   /                                   save_prompt
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::prompts;
use crate::state::AppState;

/// Prompt routes -- mounted at `/prompts`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(prompts::save_prompt))
}
