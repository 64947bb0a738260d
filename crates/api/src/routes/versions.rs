//! Route definitions for the prompt version lifecycle.
//!
//! ```text
//! POST   /{prompt_id}                                        create_version
//! GET    /{prompt_id}/versions                               list_versions
//! GET    /{prompt_id}/versions/compare                       compare_versions
//! GET    /{prompt_id}/versions/{version_id}                  get_version
//! DELETE /{prompt_id}/versions/{version_id}                  delete_version
//! POST   /{prompt_id}/versions/{version_id}/rollback         rollback_version
//! PUT    /{prompt_id}/versions/{version_id}/tag              update_version_tag
//! POST   /{prompt_id}/versions/{version_id}/use              record_version_use
//! ```

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::versions;
use crate::state::AppState;

/// Version routes -- mounted at `/versions`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{prompt_id}", post(versions::create_version))
        .route("/{prompt_id}/versions", get(versions::list_versions))
        .route(
            "/{prompt_id}/versions/compare",
            get(versions::compare_versions),
        )
        .route(
            "/{prompt_id}/versions/{version_id}",
            get(versions::get_version).delete(versions::delete_version),
        )
        .route(
            "/{prompt_id}/versions/{version_id}/rollback",
            post(versions::rollback_version),
        )
        .route(
            "/{prompt_id}/versions/{version_id}/tag",
            put(versions::update_version_tag),
        )
        .route(
            "/{prompt_id}/versions/{version_id}/use",
            post(versions::record_version_use),
        )
}
