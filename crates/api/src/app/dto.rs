use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use meditrust_core::{DomainError, Medicine, ProductKey, UserId};
use meditrust_forecast::SequenceStep;

// -------------------------
// Request DTOs
// -------------------------

/// Required fields are optional here so that a missing field is reported as
/// a validation error rather than a JSON rejection.
#[derive(Debug, Deserialize)]
pub struct VerifyLicenseRequest {
    #[serde(rename = "licenseNumber")]
    pub license_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub product_id: Option<Value>,
    pub seq: Option<Vec<SequenceStep>>,
}

#[derive(Debug, Deserialize)]
pub struct UserRecommendationsRequest {
    pub user_id: Option<Value>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct VerifyLicenseResponse {
    pub verified: bool,
    #[serde(rename = "licenseNumber")]
    pub license_number: String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predicted_quantity: f64,
}

#[derive(Debug, Serialize)]
pub struct RecommendedProduct {
    #[serde(flatten)]
    pub medicine: Medicine,
    pub predicted_quantity: f64,
}

#[derive(Debug, Serialize)]
pub struct UserRecommendationsResponse {
    pub recommended_products: Vec<RecommendedProduct>,
}

// -------------------------
// Identifier parsing
// -------------------------

/// Accepts a JSON integer, an integral float, or a numeric string.
fn integral<T: FromStr<Err = DomainError>>(value: &Value) -> Result<T, DomainError> {
    match value {
        Value::String(s) => s.parse(),
        Value::Number(n) => n.to_string().parse(),
        other => Err(DomainError::invalid_id(format!("expected a number, got {other}"))),
    }
}

pub fn parse_product_key(value: &Value) -> Result<ProductKey, DomainError> {
    integral(value)
}

pub fn parse_user_id(value: &Value) -> Result<UserId, DomainError> {
    integral(value)
}

/// Mirrors the truthiness check clients expect: absent, null, `0`, `""` and
/// `false` all count as missing.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.trim().is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_parse_from_numbers_and_strings() {
        assert_eq!(parse_product_key(&json!(42)).unwrap(), ProductKey::new(42));
        assert_eq!(parse_product_key(&json!("42")).unwrap(), ProductKey::new(42));
        assert_eq!(parse_product_key(&json!(42.0)).unwrap(), ProductKey::new(42));
        assert_eq!(parse_user_id(&json!(" 7 ")).unwrap(), UserId::new(7));
        assert!(parse_product_key(&json!("abc")).is_err());
        assert!(parse_product_key(&json!(4.5)).is_err());
        assert!(parse_product_key(&json!([1])).is_err());
    }

    #[test]
    fn blank_values() {
        for v in [json!(null), json!(0), json!(""), json!("  "), json!(false), json!([])] {
            assert!(is_blank(&v), "{v} should be blank");
        }
        for v in [json!(1), json!("x"), json!(true), json!([1])] {
            assert!(!is_blank(&v), "{v} should not be blank");
        }
    }

    #[test]
    fn recommendation_flattens_catalog_fields() {
        let mut m = Medicine::new(ProductKey::new(3));
        m.product_name = Some("Cetirizine".into());
        let v = serde_json::to_value(RecommendedProduct {
            medicine: m,
            predicted_quantity: 21.5,
        })
        .unwrap();
        assert_eq!(v["product_id"], 3);
        assert_eq!(v["product_name"], "Cetirizine");
        assert_eq!(v["predicted_quantity"], 21.5);
    }

    #[test]
    fn step_keys_are_pascal_case() {
        let req: PredictRequest = serde_json::from_value(json!({
            "product_id": 1,
            "seq": [{"RollingQuantity": 3, "DayOfWeek": 2, "Month": 5, "Day": 8, "WeekOfYear": 19}]
        }))
        .unwrap();
        let seq = req.seq.unwrap();
        assert_eq!(seq[0].week_of_year, 19.0);
    }
}
