//! Strongly-typed identifiers used across the domain.
//!
//! All identifiers are integer keys assigned by the relational store or by the
//! catalog spreadsheet, so they wrap `i64` rather than UUIDs.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Catalog serial number (`SR.NO.`) identifying a medicine.
///
/// This is the product key the demand model is trained on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductKey(i64);

/// Identifier of a customer account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

/// Identifier of a placed order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = parse_integral(s.trim())
                    .ok_or_else(|| DomainError::invalid_id(format!("{}: {:?}", $name, s)))?;
                Ok(Self(value))
            }
        }
    };
}

impl_int_newtype!(ProductKey, "ProductKey");
impl_int_newtype!(UserId, "UserId");
impl_int_newtype!(OrderId, "OrderId");

/// Spreadsheets hand serial numbers over as floats (`12.0`); accept those too.
fn parse_integral(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn display_output_parses_back(v in any::<i64>()) {
            prop_assert_eq!(ProductKey::new(v).to_string().parse::<ProductKey>().unwrap(), ProductKey::new(v));
            prop_assert_eq!(UserId::new(v).to_string().parse::<UserId>().unwrap(), UserId::new(v));
        }

        #[test]
        fn spreadsheet_float_keys_match_integer_keys(v in -1_000_000_000i64..1_000_000_000) {
            prop_assert_eq!(format!("{v}.0").parse::<ProductKey>().unwrap(), ProductKey::new(v));
        }

        #[test]
        fn fractional_keys_are_rejected(v in -1_000_000i64..1_000_000, frac in 1u32..10) {
            let input = format!("{v}.{frac}");
            prop_assert!(input.parse::<ProductKey>().is_err());
        }
    }

    #[test]
    fn product_key_parses_integers_and_integral_floats() {
        assert_eq!("42".parse::<ProductKey>().unwrap(), ProductKey::new(42));
        assert_eq!(" 7 ".parse::<ProductKey>().unwrap(), ProductKey::new(7));
        assert_eq!("12.0".parse::<ProductKey>().unwrap(), ProductKey::new(12));
    }

    #[test]
    fn product_key_rejects_garbage() {
        assert!(matches!(
            "12.5".parse::<ProductKey>(),
            Err(DomainError::InvalidId(_))
        ));
        assert!("".parse::<ProductKey>().is_err());
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ProductKey::new(3)).unwrap();
        assert_eq!(json, "3");
        let back: UserId = serde_json::from_str("11").unwrap();
        assert_eq!(back.get(), 11);
    }
}
