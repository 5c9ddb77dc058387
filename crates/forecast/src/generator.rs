//! Synthetic order-history generator.
//!
//! Produces a labeled order log over catalog products, then engineers the
//! generator feature set (calendar, rolling mean, lags) on top of it.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use meditrust_core::{OrderRecord, ProductKey, Reordered};

use crate::error::{ForecastError, ForecastResult};
use crate::features::{FeatureConfig, FeatureSet, engineer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub orders: usize,
    /// Inclusive lower bound of order dates.
    pub start: NaiveDate,
    /// Exclusive upper bound of order dates.
    pub end: NaiveDate,
    pub quantities: Vec<i64>,
    pub seed: u64,
    pub features: FeatureConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            orders: 2000,
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            quantities: vec![10, 20, 30, 50],
            seed: 42,
            features: FeatureConfig::generator(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderGenerator {
    config: GeneratorConfig,
}

impl OrderGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Raw orders, sorted by date (ties keep generation order).
    pub fn generate(&self, products: &[ProductKey]) -> ForecastResult<Vec<OrderRecord>> {
        if products.is_empty() {
            return Err(ForecastError::invalid("cannot generate orders without products"));
        }
        if self.config.quantities.is_empty() {
            return Err(ForecastError::invalid("quantity choices cannot be empty"));
        }
        let span = (self.config.end - self.config.start).num_days();
        if span <= 0 {
            return Err(ForecastError::invalid("end date must be after start date"));
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut seen: HashSet<ProductKey> = HashSet::new();
        let mut orders = Vec::with_capacity(self.config.orders);

        for i in 0..self.config.orders {
            let product = *products
                .choose(&mut rng)
                .ok_or_else(|| ForecastError::invalid("empty product list"))?;
            let offset = rng.random_range(0..span) as u64;
            let date = self.config.start + Days::new(offset);
            let quantity = *self
                .config
                .quantities
                .choose(&mut rng)
                .ok_or_else(|| ForecastError::invalid("empty quantity list"))?;
            let reordered = if seen.insert(product) {
                Reordered::No
            } else {
                Reordered::Yes
            };

            orders.push(OrderRecord::new(
                format!("ORD{}", 100_000 + i),
                product,
                date,
                quantity,
                reordered,
            )?);
        }

        orders.sort_by_key(|o| o.order_date);
        Ok(orders)
    }

    /// Orders plus engineered features; rows without full lag history dropped.
    pub fn generate_features(&self, products: &[ProductKey]) -> ForecastResult<FeatureSet> {
        let orders = self.generate(products)?;
        let set = engineer(&orders, &self.config.features);
        tracing::info!(
            generated = orders.len(),
            kept = set.rows.len(),
            dropped = set.dropped,
            products = products.len(),
            "generated synthetic order history"
        );
        Ok(set)
    }
}
