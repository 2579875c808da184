//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use zaffira_core::profile::Address;
use zaffira_core::{OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId};

/// A placed order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_amount: Price,
    pub shipping_address: Option<Json<Address>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Loaded separately from `order_items`.
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

/// One line of an order, priced when the order was placed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Price,
    pub quantity: i32,
}

/// A requested order line.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}
