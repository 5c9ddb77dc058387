//! Order history records.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::ProductKey;

/// Whether a product had already been ordered before this order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reordered {
    Yes,
    No,
}

impl Reordered {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }
}

/// One row of the historical order log used for training.
///
/// Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub product: ProductKey,
    pub order_date: NaiveDate,
    pub quantity: i64,
    pub reordered: Reordered,
}

impl OrderRecord {
    pub fn new(
        order_id: impl Into<String>,
        product: ProductKey,
        order_date: NaiveDate,
        quantity: i64,
        reordered: Reordered,
    ) -> Result<Self, DomainError> {
        let order_id = order_id.into();
        if order_id.trim().is_empty() {
            return Err(DomainError::validation("order_id cannot be empty"));
        }
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(Self {
            order_id,
            product,
            order_date,
            quantity,
            reordered,
        })
    }
}

/// A product a user ordered, as read back from the relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product: ProductKey,
    pub ordered_at: NaiveDateTime,
}
