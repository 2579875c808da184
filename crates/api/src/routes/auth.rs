//! Authentication route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb, set_sentry_user};
use crate::middleware::RequireAuth;
use crate::models::{ProfileView, User};
use crate::services::auth::{ProfileUpdate, Registration};
use crate::services::{AuthService, ChangeAction, Table};
use crate::state::AppState;

/// Sign-in form. `identifier` is a username or an email address.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "email", alias = "username")]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A token and the profile it belongs to.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: ProfileView,
}

fn signed_in(state: &AppState, user: User) -> Result<AuthResponse> {
    let token = state.tokens().issue(&user)?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

/// Create an account and sign in.
///
/// POST /api/auth/register
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let user = AuthService::new(state.pool()).register(registration).await?;

    tracing::info!(user_id = %user.id, "account registered");
    state
        .changes()
        .publish(Table::Profiles, ChangeAction::Insert, user.id);

    Ok((StatusCode::CREATED, Json(signed_in(&state, user)?)))
}

/// Sign in with username or email.
///
/// POST /api/auth/login
#[instrument(skip(state, request), fields(identifier = %request.identifier))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = AuthService::new(state.pool())
        .login(&request.identifier, &request.password)
        .await?;

    add_breadcrumb("auth", "Signed in", None);
    Ok(Json(signed_in(&state, user)?))
}

/// Sign in to the back office.
///
/// POST /api/auth/admin/login
#[instrument(skip(state, request), fields(identifier = %request.identifier))]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = AuthService::new(state.pool())
        .admin_login(&request.identifier, &request.password)
        .await?;

    tracing::info!(user_id = %user.id, "admin signed in");
    Ok(Json(signed_in(&state, user)?))
}

/// The caller's profile.
///
/// GET /api/auth/me
#[instrument(skip_all, fields(user_id = %caller.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<ProfileView>> {
    let user = AuthService::new(state.pool())
        .get_user_profile(caller.id)
        .await?;
    Ok(Json(user.into()))
}

/// Edit the caller's profile.
///
/// PUT /api/auth/me
#[instrument(skip_all, fields(user_id = %caller.id))]
pub async fn update_me(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileView>> {
    let user = AuthService::new(state.pool())
        .update_profile(caller.id, update)
        .await?;

    state
        .changes()
        .publish(Table::Profiles, ChangeAction::Update, user.id);

    Ok(Json(user.into()))
}
