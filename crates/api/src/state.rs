use std::sync::Arc;

use yprompt_versions::VersionManager;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: yprompt_db::DbPool,
    /// Server configuration (JWT settings are read by the auth extractor).
    pub config: Arc<ServerConfig>,
    /// Version lifecycle manager over the same pool.
    pub versions: VersionManager,
}

impl AppState {
    /// Build the state, wiring the version manager to `pool`.
    pub fn new(pool: yprompt_db::DbPool, config: ServerConfig) -> Self {
        let versions = VersionManager::new(pool.clone(), config.versions.clone());
        Self {
            pool,
            config: Arc::new(config),
            versions,
        }
    }
}
