//! Shopping cart and wishlist stores.
//!
//! Both are plain values owned by whoever drives the session; nothing here is
//! shared or global. Checkout builds a [`Cart`] from the submitted lines so
//! repeated product ids collapse into one line before pricing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item`, merging into an existing line for the same product.
    /// A zero quantity is treated as one unit. Fails, leaving the cart as it
    /// was, when the merged quantity would not fit.
    pub fn add(&mut self, item: CartItem) -> AppResult<()> {
        let quantity = item.quantity.max(1);
        match self.line_mut(item.product_id) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                    AppError::BadRequest(format!("Quantity too large for product {}", item.product_id))
                })?;
            }
            None => self.items.push(CartItem { quantity, ..item }),
        }
        Ok(())
    }

    /// Removes the whole line. Returns whether anything was removed.
    pub fn remove(&mut self, product_id: i64) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != before
    }

    /// Takes one unit off a line; the line disappears with its last unit.
    pub fn decrement(&mut self, product_id: i64) {
        let remaining = match self.line_mut(product_id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_sub(1);
                line.quantity
            }
            None => return,
        };
        if remaining == 0 {
            self.remove(product_id);
        }
    }

    pub fn set_quantity(&mut self, product_id: i64, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
        } else if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of units across all lines.
    pub fn count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Sum of price × quantity, rounded to cents.
    pub fn total(&self) -> f64 {
        let raw: f64 = self
            .items
            .iter()
            .map(|i| i.price * f64::from(i.quantity))
            .sum();
        round_cents(raw)
    }

    fn line_mut(&mut self, product_id: i64) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.product_id == product_id)
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wishlist {
    ids: BTreeSet<i64>,
}

impl Wishlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership; returns `true` when the product is now wished for.
    pub fn toggle(&mut self, product_id: i64) -> bool {
        if self.ids.remove(&product_id) {
            false
        } else {
            self.ids.insert(product_id);
            true
        }
    }

    pub fn contains(&self, product_id: i64) -> bool {
        self.ids.contains(&product_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
