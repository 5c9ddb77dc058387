//! Medicine catalog records (static reference data).

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::ProductKey;

/// One medicine in the supplier catalog, keyed by its serial number.
///
/// Everything except the serial number is optional: the source spreadsheet
/// leaves cells empty freely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    #[serde(rename = "product_id")]
    pub sr_number: ProductKey,
    pub product_name: Option<String>,
    pub generic_name: Option<String>,
    pub composition: Option<String>,
    pub packet_size: Option<String>,
    pub uses: Option<String>,
    pub transfer_price: Option<f64>,
    pub storage_condition: Option<String>,
}

impl Medicine {
    pub fn new(sr_number: ProductKey) -> Self {
        Self {
            sr_number,
            product_name: None,
            generic_name: None,
            composition: None,
            packet_size: None,
            uses: None,
            transfer_price: None,
            storage_condition: None,
        }
    }

    /// Reject records that could not have come from a sane catalog row.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.sr_number.get() <= 0 {
            return Err(DomainError::validation("sr_number must be positive"));
        }
        if let Some(price) = self.transfer_price {
            if !price.is_finite() || price < 0.0 {
                return Err(DomainError::validation(
                    "transfer_price must be a finite non-negative number",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_serial_number_as_product_id() {
        let mut m = Medicine::new(ProductKey::new(5));
        m.product_name = Some("Paracetamol".to_string());
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["product_id"], 5);
        assert_eq!(v["product_name"], "Paracetamol");
        assert!(v["uses"].is_null());
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut m = Medicine::new(ProductKey::new(1));
        m.transfer_price = Some(-1.0);
        assert!(matches!(m.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn non_positive_serial_is_rejected() {
        assert!(Medicine::new(ProductKey::new(0)).validate().is_err());
        assert!(Medicine::new(ProductKey::new(9)).validate().is_ok());
    }
}
