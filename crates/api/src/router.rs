//! Application router: route tree plus the HTTP middleware shared by the
//! binary and the integration tests.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use yprompt_core::versioning::{MAX_CHANGE_LOG_LENGTH, MAX_CHANGE_SUMMARY_LENGTH, MAX_PROMPT_LENGTH};

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Worst-case JSON size of one character: a `\uXXXX` escape.
const MAX_ENCODED_CHAR_BYTES: usize = 6;

/// Allowance for title, description, tags and the JSON envelope.
const METADATA_BODY_BYTES: usize = 64 * 1024;

/// Largest request body accepted under `/api/v1`.
///
/// Sized so a save or version request carrying a prompt, change log and
/// summary at their character limits always fits, while anything much larger
/// is refused with `413` before it is buffered.
pub const MAX_REQUEST_BODY_BYTES: usize = (MAX_PROMPT_LENGTH + MAX_CHANGE_LOG_LENGTH + MAX_CHANGE_SUMMARY_LENGTH)
    * MAX_ENCODED_CHAR_BYTES
    + METADATA_BODY_BYTES;

/// Build the full application [`Router`].
///
/// Layers run outermost first on the way in: CORS, request id assignment,
/// tracing, request id echo, timeout, then panic recovery. The body limit
/// applies to the versioned API only; `/health` takes no body.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let api = routes::api_routes().layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES));

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", api)
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// CORS for the configured browser origins.
///
/// Allows exactly the methods the version API routes use and exposes the
/// request id so a front end can quote it in bug reports. An origin that is
/// not a valid header value aborts startup.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{origin}': {e}"))
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
