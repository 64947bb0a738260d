//! Liveness and readiness of the version service.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when versions can be served; `degraded` otherwise.
    pub status: &'static str,
    pub version: &'static str,
    /// The database answered a query.
    pub db_healthy: bool,
    /// The prompt and version tables are present.
    pub version_store_ready: bool,
}

/// Always answers `200`; callers read `status` to decide readiness.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = yprompt_db::health_check(&state.pool).await.is_ok();

    let version_store_ready = if db_healthy {
        yprompt_db::version_store_ready(&state.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Version store readiness query failed");
                false
            })
    } else {
        false
    };

    Json(HealthResponse {
        status: if version_store_ready { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        version_store_ready,
    })
}

/// Mounted at the root, outside `/api/v1`, and without authentication.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
