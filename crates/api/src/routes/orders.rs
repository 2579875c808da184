//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use zaffira_core::OrderId;
use zaffira_core::profile::Address;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderLineRequest};
use crate::services::{ChangeAction, Table};
use crate::state::AppState;

/// Checkout request. Prices come from the product rows, never the client.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
}

impl PlaceOrderRequest {
    /// Reject empty orders and zero quantities.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation`.
    pub fn check(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(AppError::Validation(
                "An order needs at least one item".to_string(),
            ));
        }
        if self.items.iter().any(|line| line.quantity == 0) {
            return Err(AppError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The caller's orders.
///
/// GET /api/orders
#[instrument(skip_all, fields(user_id = %caller.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(caller.id)
        .await?;
    Ok(Json(orders))
}

/// One of the caller's orders.
///
/// GET /api/orders/{id}
#[instrument(skip_all, fields(user_id = %caller.id, order_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get_for_user(id, caller.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Place an order.
///
/// POST /api/orders
#[instrument(skip_all, fields(user_id = %caller.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    request.check()?;

    let order = OrderRepository::new(state.pool())
        .place(caller.id, &request.items, request.shipping_address.as_ref())
        .await?;

    tracing::info!(order_id = %order.id, total = %order.total_amount, "order placed");
    state
        .changes()
        .publish(Table::Orders, ChangeAction::Insert, order.id);
    for item in &order.items {
        state
            .changes()
            .publish(Table::Products, ChangeAction::Update, item.product_id);
    }

    Ok((StatusCode::CREATED, Json(order)))
}
