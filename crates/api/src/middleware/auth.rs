//! Caller identity for the version API.
//!
//! Every prompt and version is owned by a user id, and the version manager
//! scopes each lookup by that id. [`AuthUser`] is where the id comes from: the
//! `sub` claim of a bearer JWT signed with the server's secret.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use yprompt_core::error::CoreError;
use yprompt_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated owner of the prompts a request may touch.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Owner id compared against `prompts.user_id`.
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).map_err(unauthorized)?;

        let claims = validate_token(token, &state.config.jwt).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            unauthorized("Invalid or expired token")
        })?;

        // Ids are BIGSERIAL, so a non-positive subject cannot own anything.
        if claims.sub <= 0 {
            return Err(unauthorized("Token subject is not a valid user id"));
        }

        Ok(AuthUser { user_id: claims.sub })
    }
}

/// Pull the token out of `Authorization: Bearer <token>`. The scheme name is
/// matched case-insensitively.
fn bearer_token(parts: &Parts) -> Result<&str, &'static str> {
    let value = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Authorization header is not valid text")?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or("Invalid Authorization format. Expected: Bearer <token>")?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("Invalid Authorization format. Expected: Bearer <token>");
    }

    let token = token.trim();
    if token.is_empty() {
        return Err("Bearer token is empty");
    }
    Ok(token)
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.to_string()))
}
