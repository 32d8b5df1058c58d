//! Cart rules shared by every store backend.
//!
//! A [`Cart`] holds at most one line per product. Quantities are clamped to
//! the stock seen when the line is touched; reaching zero drops the line.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{CartLine, Product},
    validation::validate_personalization,
};

/// Who a persisted cart belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum CartOwner {
    User(Uuid),
    Guest(Uuid),
}

impl CartOwner {
    pub fn kind(&self) -> &'static str {
        match self {
            CartOwner::User(_) => "user",
            CartOwner::Guest(_) => "guest",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            CartOwner::User(id) | CartOwner::Guest(id) => *id,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be greater than 0")]
    InvalidQuantity,
    #[error("product {0} is out of stock")]
    OutOfStock(String),
    #[error("product {0} cannot be personalized")]
    NotPersonalizable(String),
    #[error("{0}")]
    InvalidPersonalization(String),
    #[error("product {0} is not in the cart")]
    NotInCart(String),
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::NotInCart(_) => AppError::NotFound,
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Line quantity after the add.
    pub quantity: i32,
    /// True when the requested amount did not fit in the stock.
    pub capped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }

    /// Adds `quantity` units, merging with an existing line for the product.
    pub fn add(
        &mut self,
        product: &Product,
        quantity: i32,
        personalization: Option<&str>,
    ) -> Result<AddOutcome, CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity);
        }
        if product.stock <= 0 {
            return Err(CartError::OutOfStock(product.id.clone()));
        }
        let personalization = normalize_personalization(product, personalization)?;

        let stock = product.stock;
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let wanted = line.quantity.saturating_add(quantity);
            line.quantity = wanted.min(stock);
            if personalization.is_some() {
                line.personalization = personalization;
            }
            return Ok(AddOutcome {
                quantity: line.quantity,
                capped: wanted > stock,
            });
        }

        let granted = quantity.min(stock);
        self.lines.push(CartLine {
            product_id: product.id.clone(),
            quantity: granted,
            personalization,
            added_at: Utc::now(),
        });
        Ok(AddOutcome {
            quantity: granted,
            capped: quantity > stock,
        })
    }

    /// Sets the line quantity, clamped to `[0, stock]`. Zero removes the line.
    pub fn set_quantity(&mut self, product: &Product, quantity: i32) -> Result<i32, CartError> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.product_id == product.id)
            .ok_or_else(|| CartError::NotInCart(product.id.clone()))?;

        let clamped = quantity.clamp(0, product.stock.max(0));
        if clamped == 0 {
            self.lines.remove(idx);
        } else if let Some(line) = self.lines.get_mut(idx) {
            line.quantity = clamped;
        }
        Ok(clamped)
    }

    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Moves the lines of `other` into an empty cart. Returns false, leaving
    /// both untouched, when this cart already has lines.
    pub fn adopt(&mut self, other: Cart) -> bool {
        if !self.is_empty() || other.is_empty() {
            return false;
        }
        self.lines = other.lines;
        true
    }
}

fn normalize_personalization(
    product: &Product,
    message: Option<&str>,
) -> Result<Option<String>, CartError> {
    let Some(message) = message.map(str::trim).filter(|m| !m.is_empty()) else {
        return Ok(None);
    };
    if !product.personalizable {
        return Err(CartError::NotPersonalizable(product.id.clone()));
    }
    validate_personalization(message).map_err(CartError::InvalidPersonalization)?;
    Ok(Some(message.to_string()))
}
