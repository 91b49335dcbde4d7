use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::OrderLineInput;

/// Per-session shopping cart: product id -> requested quantity.
///
/// Serialized as a JSON object into the session row, so the map survives
/// across requests and server restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(HashMap<Uuid, i32>);

impl Cart {
    pub fn new() -> Cart {
        Cart::default()
    }

    /// Add `quantity` to the product's entry, creating it if absent.
    pub fn add(&mut self, product_id: Uuid, quantity: i32) {
        if quantity <= 0 {
            return;
        }
        *self.0.entry(product_id).or_insert(0) += quantity;
    }

    /// Set the product's quantity outright; zero or negative removes it.
    pub fn set(&mut self, product_id: Uuid, quantity: i32) {
        if quantity <= 0 {
            self.0.remove(&product_id);
        } else {
            self.0.insert(product_id, quantity);
        }
    }

    pub fn remove(&mut self, product_id: Uuid) {
        self.0.remove(&product_id);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn quantity_of(&self, product_id: Uuid) -> i32 {
        self.0.get(&product_id).copied().unwrap_or(0)
    }

    pub fn items(&self) -> impl Iterator<Item = (Uuid, i32)> + '_ {
        self.0.iter().map(|(id, qty)| (*id, *qty))
    }

    /// Order lines for checkout, sorted by product id so an order built
    /// from the same cart is always identical.
    pub fn to_lines(&self) -> Vec<OrderLineInput> {
        let mut lines: Vec<OrderLineInput> = self
            .0
            .iter()
            .map(|(id, qty)| OrderLineInput {
                product_id: *id,
                quantity: *qty,
            })
            .collect();
        lines.sort_by_key(|l| l.product_id);
        lines
    }
}

/// Server-side session record, keyed by an opaque token carried in an
/// HttpOnly cookie. Username/role/email are deliberately NOT cached here;
/// they are re-read from the user row on every request.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub token: String,
    pub user_id: Uuid,
    pub cart: Cart,
}
