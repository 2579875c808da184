//! Order repository.

use std::collections::BTreeMap;

use sqlx::PgPool;
use sqlx::types::Json;

use zaffira_core::profile::Address;
use zaffira_core::{OrderId, Price, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderItem, OrderLineRequest};

macro_rules! order_columns {
    () => {
        "id, user_id, status, total_amount, shipping_address, created_at, updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct StockRow {
    name: String,
    price: Price,
    stock_quantity: i32,
    is_active: bool,
}

/// Merge duplicate lines and sort by product ID.
///
/// Rows are locked in this order, so concurrent orders never deadlock.
fn merge_lines(lines: &[OrderLineRequest]) -> BTreeMap<ProductId, u32> {
    let mut merged = BTreeMap::new();
    for line in lines {
        let qty = merged.entry(line.product_id).or_insert(0u32);
        *qty = qty.saturating_add(line.quantity);
    }
    merged
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order in one transaction.
    ///
    /// Each line is priced from the current product row, the product must be
    /// active and have enough stock, and stock is decremented.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a product is unknown, inactive,
    /// or short on stock; nothing is written in that case.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn place(
        &self,
        user_id: UserId,
        lines: &[OrderLineRequest],
        shipping_address: Option<&Address>,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut priced = Vec::new();

        for (product_id, quantity) in merge_lines(lines) {
            let stock = sqlx::query_as::<_, StockRow>(
                "SELECT name, price, stock_quantity, is_active FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .filter(|row| row.is_active)
            .ok_or_else(|| {
                RepositoryError::Conflict(format!("product {product_id} is not available"))
            })?;

            let wanted = i32::try_from(quantity).unwrap_or(i32::MAX);
            if stock.stock_quantity < wanted {
                return Err(RepositoryError::Conflict(format!(
                    "insufficient stock for {} ({} left)",
                    stock.name, stock.stock_quantity
                )));
            }

            sqlx::query("UPDATE products SET stock_quantity = stock_quantity - $2 WHERE id = $1")
                .bind(product_id)
                .bind(wanted)
                .execute(&mut *tx)
                .await?;

            priced.push((product_id, stock.name, stock.price, wanted, quantity));
        }

        let total = priced
            .iter()
            .map(|(_, _, price, _, quantity)| price.checked_times(*quantity))
            .collect::<Option<Vec<_>>>()
            .and_then(Price::checked_sum)
            .ok_or_else(|| RepositoryError::Conflict("order total is too large".to_string()))?;

        let mut order = sqlx::query_as::<_, Order>(concat!(
            "INSERT INTO orders (user_id, total_amount, shipping_address) VALUES ($1, $2, $3) RETURNING ",
            order_columns!()
        ))
        .bind(user_id)
        .bind(total)
        .bind(shipping_address.map(Json))
        .fetch_one(&mut *tx)
        .await?;

        for (product_id, product_name, price, quantity, _) in priced {
            let item = sqlx::query_as::<_, OrderItem>(
                r"
                INSERT INTO order_items (order_id, product_id, price, quantity)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, product_id, $5::text AS product_name, price, quantity
                ",
            )
            .bind(order.id)
            .bind(product_id)
            .bind(price)
            .bind(quantity)
            .bind(product_name)
            .fetch_one(&mut *tx)
            .await?;
            order.items.push(item);
        }

        tx.commit().await?;
        Ok(order)
    }

    /// A user's orders with their items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let items = self.items_for(&ids).await?;
        for order in &mut orders {
            order.items = items
                .iter()
                .filter(|item| item.order_id == order.id)
                .cloned()
                .collect();
        }
        Ok(orders)
    }

    /// One of a user's orders with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(mut order) = order else {
            return Ok(None);
        };
        order.items = self.items_for(&[order.id]).await?;
        Ok(Some(order))
    }

    async fn items_for(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItem>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<uuid::Uuid> = order_ids.iter().map(OrderId::as_uuid).collect();
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, oi.price, oi.quantity
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.created_at
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }
}
