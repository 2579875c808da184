//! Admin dashboard counters.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::db::appointments::AppointmentStats;
use crate::db::products::ProductStats;
use crate::db::{AppointmentRepository, ProductRepository, UserRepository};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Dashboard numbers.
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub products: ProductStats,
    pub appointments: AppointmentStats,
    pub customers: i64,
}

/// Product, appointment and customer counts.
///
/// GET /api/admin/stats
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    let products = ProductRepository::new(state.pool());
    let appointments = AppointmentRepository::new(state.pool());
    let users = UserRepository::new(state.pool());

    let (products, appointments, customers) = tokio::try_join!(
        products.stats(),
        appointments.stats(),
        users.count_customers(),
    )?;

    Ok(Json(DashboardStats {
        products,
        appointments,
        customers,
    }))
}
