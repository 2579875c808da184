//! Back-office customer management.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use zaffira_core::{Role, UserId};

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{CustomerSummary, ProfileView};
use crate::services::{ChangeAction, Table};
use crate::state::AppState;

/// New role for an account.
#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

/// Every account with its appointment count.
///
/// GET /api/admin/customers
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<CustomerSummary>>> {
    let customers = UserRepository::new(state.pool()).list_customers().await?;
    Ok(Json(customers))
}

/// Promote or demote an account.
///
/// Admins cannot demote themselves, so the back office always keeps at
/// least the caller.
///
/// PUT /api/admin/customers/{id}/role
#[instrument(skip_all, fields(admin = %admin.id, user_id = %id))]
pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<ProfileView>> {
    if id == admin.id && !request.role.is_admin() {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin access".to_string(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .set_role(id, request.role)
        .await?;

    tracing::info!(role = %user.role, "role changed");
    state
        .changes()
        .publish(Table::Profiles, ChangeAction::Update, id);

    Ok(Json(user.into()))
}
