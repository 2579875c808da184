//! Shopping cart state.
//!
//! The cart is a session value: it is mutated through [`CartAction`]s and
//! only reaches the database as a snapshot embedded in an appointment or
//! an order.

use serde::{Deserialize, Serialize};

use crate::product::Product;
use crate::types::{Price, ProductId};

/// One cart line.
///
/// Also the shape of the snapshot stored with an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
    #[serde(default)]
    pub image: String,
}

impl CartItem {
    /// A line for `quantity` units of `product`.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity,
            image: product.image_url().to_owned(),
        }
    }

    /// `price × quantity`, or `None` past [`Price::MAX`].
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.price.checked_times(self.quantity)
    }
}

/// A change to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartAction {
    /// Add a line, merging with an existing line for the same product.
    AddItem(CartItem),
    /// Drop the line for a product.
    RemoveItem(ProductId),
    /// Set a line's quantity; zero or less removes it.
    UpdateQuantity { id: ProductId, quantity: i64 },
    /// Empty the cart.
    Clear,
}

/// The cart contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Rebuild a cart from stored lines, merging duplicates.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        items
            .into_iter()
            .fold(Self::new(), |cart, item| cart.apply(CartAction::AddItem(item)))
    }

    /// Apply an action and return the new state.
    #[must_use]
    pub fn apply(mut self, action: CartAction) -> Self {
        self.dispatch(action);
        self
    }

    /// Apply an action in place.
    pub fn dispatch(&mut self, action: CartAction) {
        match action {
            CartAction::AddItem(item) => {
                if item.quantity == 0 {
                    return;
                }
                if let Some(line) = self.items.iter_mut().find(|l| l.id == item.id) {
                    line.quantity = line.quantity.saturating_add(item.quantity);
                } else {
                    self.items.push(item);
                }
            }
            CartAction::RemoveItem(id) => self.items.retain(|l| l.id != id),
            CartAction::UpdateQuantity { id, quantity } => match u32::try_from(quantity) {
                Ok(q) if q > 0 => {
                    if let Some(line) = self.items.iter_mut().find(|l| l.id == id) {
                        line.quantity = q;
                    }
                }
                _ => self.items.retain(|l| l.id != id),
            },
            CartAction::Clear => self.items.clear(),
        }
    }

    /// The cart lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `price × quantity` over every line, or `None` if it does not
    /// fit a [`Price`].
    #[must_use]
    pub fn total(&self) -> Option<Price> {
        self.items
            .iter()
            .map(CartItem::line_total)
            .try_fold(Price::ZERO, |total, line| total.checked_add(line?))
    }

    /// Sum of quantities over every line.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Copy the current lines for embedding in an appointment.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CartItem> {
        self.items.clone()
    }

    /// Snapshot the lines and empty the cart.
    pub fn take_snapshot(&mut self) -> Vec<CartItem> {
        std::mem::take(&mut self.items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn item(id: ProductId, price: u32, quantity: u32) -> CartItem {
        CartItem {
            id,
            name: format!("Item {price}"),
            price: Price::from_rupees(price),
            quantity,
            image: String::new(),
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let id = ProductId::generate();
        let cart = Cart::new()
            .apply(CartAction::AddItem(item(id, 1_000, 1)))
            .apply(CartAction::AddItem(item(id, 1_000, 2)));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), Some(Price::from_rupees(3_000)));
    }

    #[test]
    fn test_totals_across_lines() {
        let cart = Cart::from_items([
            item(ProductId::generate(), 45_000, 1),
            item(ProductId::generate(), 2_500, 4),
        ]);
        assert_eq!(cart.total(), Some(Price::from_rupees(55_000)));
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_total_past_max_is_none() {
        let mut line = item(ProductId::generate(), 1, 2);
        line.price = Price::MAX;
        assert_eq!(line.line_total(), None);

        let mut cart = Cart::from_items([item(ProductId::generate(), 1, 1)]);
        let mut top = item(ProductId::generate(), 1, 1);
        top.price = Price::MAX;
        cart.dispatch(CartAction::AddItem(top));
        assert_eq!(cart.total(), None);
    }

    #[test]
    fn test_update_quantity_and_remove_on_zero() {
        let a = ProductId::generate();
        let b = ProductId::generate();
        let mut cart = Cart::from_items([item(a, 100, 1), item(b, 200, 1)]);

        cart.dispatch(CartAction::UpdateQuantity { id: a, quantity: 5 });
        assert_eq!(cart.items()[0].quantity, 5);

        cart.dispatch(CartAction::UpdateQuantity { id: a, quantity: 0 });
        assert_eq!(cart.items().len(), 1);

        cart.dispatch(CartAction::UpdateQuantity { id: b, quantity: -2 });
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_unknown_line_is_noop() {
        let mut cart = Cart::from_items([item(ProductId::generate(), 100, 1)]);
        let before = cart.clone();
        cart.dispatch(CartAction::UpdateQuantity {
            id: ProductId::generate(),
            quantity: 4,
        });
        assert_eq!(cart, before);
    }

    #[test]
    fn test_remove_and_clear() {
        let a = ProductId::generate();
        let mut cart = Cart::from_items([item(a, 100, 1), item(ProductId::generate(), 5, 2)]);
        cart.dispatch(CartAction::RemoveItem(a));
        assert_eq!(cart.items().len(), 1);
        cart.dispatch(CartAction::Clear);
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Some(Price::ZERO));
    }

    #[test]
    fn test_take_snapshot_clears() {
        let mut cart = Cart::from_items([item(ProductId::generate(), 100, 2)]);
        let snapshot = cart.take_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let id = ProductId::generate();
        let mut cart = Cart::from_items([item(id, 100, 1)]);
        let snapshot = cart.snapshot();
        cart.dispatch(CartAction::UpdateQuantity { id, quantity: 9 });
        assert_eq!(snapshot[0].quantity, 1);
    }

    #[test]
    fn test_action_wire_format() {
        let json = serde_json::to_value(CartAction::Clear).unwrap();
        assert_eq!(json["type"], "CLEAR");
        let action: CartAction = serde_json::from_str(
            r#"{"type":"REMOVE_ITEM","payload":"00000000-0000-0000-0000-000000000000"}"#,
        )
        .unwrap();
        assert!(matches!(action, CartAction::RemoveItem(_)));
    }
}
