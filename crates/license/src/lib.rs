//! `meditrust-license`
//!
//! **Responsibility:** pharmacy license-number verification.
//!
//! - [`LicenseClassifier`] is the seam handlers depend on.
//! - [`BertLicenseClassifier`] runs a fine-tuned BERT sequence classifier on
//!   CPU via candle.

pub mod bert;
pub mod error;

pub use bert::{BertLicenseClassifier, MAX_TOKENS};
pub use error::{LicenseError, LicenseResult};

use serde::{Deserialize, Serialize};

/// Outcome of classifying a license number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseVerdict {
    Valid,
    Invalid,
}

impl LicenseVerdict {
    /// Label index 1 is the "valid" class of the fine-tuned head.
    pub fn from_label(label: u32) -> Self {
        if label == 1 { Self::Valid } else { Self::Invalid }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

pub trait LicenseClassifier: Send + Sync + 'static {
    fn classify(&self, license_number: &str) -> LicenseResult<LicenseVerdict>;
}
