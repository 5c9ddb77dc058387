//! Product-key label encoding for the embedding layer.

use serde::{Deserialize, Serialize};

use meditrust_core::ProductKey;

use crate::error::{ForecastError, ForecastResult};

/// Maps product keys to dense indices `0..len`, ordered by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<ProductKey>,
}

impl LabelEncoder {
    pub fn fit(keys: impl IntoIterator<Item = ProductKey>) -> Self {
        let mut classes: Vec<ProductKey> = keys.into_iter().collect();
        classes.sort_unstable();
        classes.dedup();
        Self { classes }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn contains(&self, key: ProductKey) -> bool {
        self.classes.binary_search(&key).is_ok()
    }

    pub fn transform(&self, key: ProductKey) -> ForecastResult<usize> {
        self.classes
            .binary_search(&key)
            .map_err(|_| ForecastError::UnknownProduct(key))
    }
}
