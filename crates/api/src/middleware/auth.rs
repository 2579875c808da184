//! Authentication extractors.
//!
//! Callers authenticate with `Authorization: Bearer <token>`. The token only
//! names the account: every request reloads the profile, so a demoted,
//! deactivated or deleted account loses access immediately and the role
//! always comes from the database.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a valid bearer token with the admin role.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that optionally gets the current user.
///
/// Missing or invalid tokens, and lookup failures, yield `None` instead of
/// rejecting.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// The token from an `Authorization: Bearer` header, if present.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Verify the token and load the account it names.
///
/// Unknown and inactive accounts are rejected like a bad token.
async fn authenticate(token: &str, state: &AppState) -> Result<CurrentUser, AppError> {
    let claims = state.tokens().verify(token)?;
    let user = UserRepository::new(state.pool())
        .get_by_id(claims.id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::Unauthorized("Account is not active".to_string()))?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(CurrentUser::from(&user))
}

async fn require_user(parts: &Parts, state: &AppState) -> Result<CurrentUser, AppError> {
    let token = bearer_token(&parts.headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
    authenticate(token, state).await
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_user(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require_user(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden(
                "Access denied. Admin privileges required.".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match bearer_token(&parts.headers) {
            Some(token) => authenticate(token, state).await.ok(),
            None => None,
        };
        Ok(Self(user))
    }
}
