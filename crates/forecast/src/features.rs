//! Feature engineering over raw order rows.
//!
//! Model:
//! - Calendar features are derived from the order date alone.
//! - Rolling aggregates and lags are computed per product, over the product's
//!   rows in chronological order.
//! - Rolling aggregates use `min_periods = 1`, so they never drop rows.
//! - Lags need `lags` prior rows; rows with less history are dropped and
//!   counted in [`FeatureSet::dropped`].

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use meditrust_core::{OrderRecord, ProductKey};

/// Calendar features of a single date.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// Monday = 0 … Sunday = 6.
    pub day_of_week: u32,
    pub month: u32,
    pub day: u32,
    /// ISO-8601 week number.
    pub week_of_year: u32,
}

impl CalendarFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            day_of_week: date.weekday().num_days_from_monday(),
            month: date.month(),
            day: date.day(),
            week_of_year: date.iso_week().week(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollingKind {
    Sum,
    Mean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Trailing window (in rows) of the rolling quantity aggregate.
    pub rolling_window: usize,
    pub rolling_kind: RollingKind,
    /// Number of lagged quantities (`t-1 … t-lags`). Zero disables lags.
    pub lags: usize,
}

impl FeatureConfig {
    /// Features written by the synthetic order generator.
    pub fn generator() -> Self {
        Self {
            rolling_window: 5,
            rolling_kind: RollingKind::Mean,
            lags: 3,
        }
    }

    /// Features consumed by the training pipeline.
    pub fn training() -> Self {
        Self {
            rolling_window: 5,
            rolling_kind: RollingKind::Sum,
            lags: 0,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self::generator()
    }
}

/// An order row plus its derived features.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredOrder {
    pub record: OrderRecord,
    pub calendar: CalendarFeatures,
    pub rolling_quantity: f64,
    /// `lags[0]` is `t-1`, `lags[1]` is `t-2`, …
    pub lags: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// Surviving rows, in input order.
    pub rows: Vec<EngineeredOrder>,
    /// Rows dropped for lacking a full lag history.
    pub dropped: usize,
}

/// Rolling aggregate over a trailing window with `min_periods = 1`.
pub fn rolling(values: &[f64], window: usize, kind: RollingKind) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        let n = (i + 1).min(window);
        out.push(match kind {
            RollingKind::Sum => sum,
            RollingKind::Mean => sum / n as f64,
        });
    }

    out
}

/// Value `lag` rows earlier, if there is one.
pub fn lagged(values: &[f64], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(lag).map(|j| values[j]))
        .collect()
}

/// Indices of `records` grouped per product, each group in chronological order.
///
/// Ties on date keep input order.
pub fn group_chronologically(records: &[OrderRecord]) -> BTreeMap<ProductKey, Vec<usize>> {
    let mut groups: BTreeMap<ProductKey, Vec<usize>> = BTreeMap::new();
    for (i, r) in records.iter().enumerate() {
        groups.entry(r.product).or_default().push(i);
    }
    for idxs in groups.values_mut() {
        idxs.sort_by_key(|&i| records[i].order_date);
    }
    groups
}

/// Compute calendar, rolling and lag features for every row.
pub fn engineer(records: &[OrderRecord], config: &FeatureConfig) -> FeatureSet {
    let mut rolling_by_row = vec![0.0; records.len()];
    let mut lags_by_row: Vec<Vec<Option<f64>>> = vec![Vec::new(); records.len()];

    for idxs in group_chronologically(records).values() {
        let quantities: Vec<f64> = idxs.iter().map(|&i| records[i].quantity as f64).collect();
        let rolled = rolling(&quantities, config.rolling_window, config.rolling_kind);
        let per_lag: Vec<Vec<Option<f64>>> = (1..=config.lags)
            .map(|lag| lagged(&quantities, lag))
            .collect();

        for (pos, &row) in idxs.iter().enumerate() {
            rolling_by_row[row] = rolled[pos];
            lags_by_row[row] = per_lag.iter().map(|l| l[pos]).collect();
        }
    }

    let mut rows = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for (i, record) in records.iter().enumerate() {
        let lags: Option<Vec<f64>> = lags_by_row[i].iter().copied().collect();
        match lags {
            Some(lags) => rows.push(EngineeredOrder {
                record: record.clone(),
                calendar: CalendarFeatures::from_date(record.order_date),
                rolling_quantity: rolling_by_row[i],
                lags,
            }),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::info!(
            dropped,
            kept = rows.len(),
            lags = config.lags,
            "dropped order rows lacking full lag history"
        );
    }

    FeatureSet { rows, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meditrust_core::Reordered;
    use proptest::prelude::*;

    fn order(id: usize, product: i64, date: (i32, u32, u32), qty: i64) -> OrderRecord {
        OrderRecord::new(
            format!("ORD{id}"),
            ProductKey::new(product),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            qty,
            Reordered::No,
        )
        .unwrap()
    }

    #[test]
    fn calendar_features_follow_iso_conventions() {
        // 2024-12-30 is a Monday in ISO week 1 of 2025.
        let f = CalendarFeatures::from_date(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
        assert_eq!(f.day_of_week, 0);
        assert_eq!(f.month, 12);
        assert_eq!(f.day, 30);
        assert_eq!(f.week_of_year, 1);

        let sunday = CalendarFeatures::from_date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(sunday.day_of_week, 6);
        assert_eq!(sunday.week_of_year, 52);
    }

    #[test]
    fn rolling_uses_min_periods_of_one() {
        let v = [10.0, 20.0, 30.0, 50.0];
        assert_eq!(rolling(&v, 2, RollingKind::Sum), vec![10.0, 30.0, 50.0, 80.0]);
        assert_eq!(rolling(&v, 3, RollingKind::Mean), vec![10.0, 15.0, 20.0, 100.0 / 3.0]);
    }

    #[test]
    fn lags_are_none_until_history_exists() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(lagged(&v, 1), vec![None, Some(1.0), Some(2.0)]);
        assert_eq!(lagged(&v, 3), vec![None, None, None]);
    }

    #[test]
    fn engineer_computes_features_per_product_and_drops_short_history() {
        // Interleaved products, rows in date order.
        let records = vec![
            order(0, 1, (2023, 1, 2), 10),
            order(1, 2, (2023, 1, 3), 50),
            order(2, 1, (2023, 1, 4), 20),
            order(3, 1, (2023, 1, 5), 30),
            order(4, 1, (2023, 1, 6), 50),
            order(5, 2, (2023, 1, 7), 10),
        ];

        let set = engineer(&records, &FeatureConfig::generator());

        // Product 1 has 4 rows -> 1 survives with 3 lags; product 2 has 2 rows -> none.
        assert_eq!(set.dropped, 5);
        assert_eq!(set.rows.len(), 1);
        let row = &set.rows[0];
        assert_eq!(row.record.order_id, "ORD4");
        assert_eq!(row.lags, vec![30.0, 20.0, 10.0]);
        assert_eq!(row.rolling_quantity, (10.0 + 20.0 + 30.0 + 50.0) / 4.0);
    }

    #[test]
    fn engineer_orders_groups_by_date_not_input_order() {
        let records = vec![
            order(0, 1, (2023, 3, 1), 30),
            order(1, 1, (2023, 1, 1), 10),
            order(2, 1, (2023, 2, 1), 20),
        ];
        let set = engineer(&records, &FeatureConfig::training());

        assert_eq!(set.dropped, 0);
        // Output keeps input order; rolling sums follow chronology.
        let sums: Vec<f64> = set.rows.iter().map(|r| r.rolling_quantity).collect();
        assert_eq!(sums, vec![60.0, 10.0, 30.0]);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: with lags disabled no row is ever dropped, and the rolling
        /// sum of a product's first row equals its own quantity.
        #[test]
        fn no_lags_means_no_drops(
            qtys in prop::collection::vec(1i64..100, 1..40),
            products in prop::collection::vec(1i64..5, 1..40),
        ) {
            let n = qtys.len().min(products.len());
            let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
            let records: Vec<OrderRecord> = (0..n)
                .map(|i| OrderRecord::new(
                    format!("ORD{i}"),
                    ProductKey::new(products[i]),
                    base + chrono::Days::new(i as u64),
                    qtys[i],
                    Reordered::No,
                ).unwrap())
                .collect();

            let set = engineer(&records, &FeatureConfig::training());
            prop_assert_eq!(set.dropped, 0);
            prop_assert_eq!(set.rows.len(), n);

            let mut seen = std::collections::HashSet::new();
            for row in &set.rows {
                if seen.insert(row.record.product) {
                    prop_assert_eq!(row.rolling_quantity, row.record.quantity as f64);
                }
            }
        }

        /// Property: dropped rows are exactly the first `lags` rows of each product.
        #[test]
        fn dropped_count_matches_short_histories(
            products in prop::collection::vec(1i64..6, 0..60),
            lags in 0usize..5,
        ) {
            let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
            let records: Vec<OrderRecord> = products.iter().enumerate()
                .map(|(i, p)| OrderRecord::new(
                    format!("ORD{i}"),
                    ProductKey::new(*p),
                    base + chrono::Days::new(i as u64),
                    10,
                    Reordered::No,
                ).unwrap())
                .collect();

            let config = FeatureConfig { rolling_window: 5, rolling_kind: RollingKind::Mean, lags };
            let set = engineer(&records, &config);

            let expected: usize = group_chronologically(&records)
                .values()
                .map(|g| g.len().min(lags))
                .sum();
            prop_assert_eq!(set.dropped, expected);
            prop_assert_eq!(set.rows.len() + set.dropped, records.len());
        }
    }
}
