//! Sequence windows: the model's input shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use meditrust_core::ProductKey;

use crate::features::{CalendarFeatures, FeatureSet, group_chronologically};

/// Width of a [`SequenceStep`] as seen by the model.
pub const NUM_FEATURES: usize = 5;

/// Default number of steps per window.
pub const DEFAULT_SEQUENCE_LEN: usize = 5;

/// One time step of model input.
///
/// Serialized with the PascalCase keys clients send (`RollingQuantity`, …).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SequenceStep {
    pub rolling_quantity: f64,
    pub day_of_week: f64,
    pub month: f64,
    pub day: f64,
    pub week_of_year: f64,
}

impl SequenceStep {
    /// Substituted for missing steps when a sequence is too short.
    pub const PADDING: SequenceStep = SequenceStep {
        rolling_quantity: 0.0,
        day_of_week: 0.0,
        month: 1.0,
        day: 1.0,
        week_of_year: 1.0,
    };

    pub fn new(rolling_quantity: f64, calendar: CalendarFeatures) -> Self {
        Self {
            rolling_quantity,
            day_of_week: calendar.day_of_week as f64,
            month: calendar.month as f64,
            day: calendar.day as f64,
            week_of_year: calendar.week_of_year as f64,
        }
    }

    pub fn from_date(rolling_quantity: f64, date: NaiveDate) -> Self {
        Self::new(rolling_quantity, CalendarFeatures::from_date(date))
    }

    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.rolling_quantity,
            self.day_of_week,
            self.month,
            self.day,
            self.week_of_year,
        ]
    }
}

/// Keep the first `len` steps, padding with [`SequenceStep::PADDING`].
pub fn pad_or_truncate(steps: &[SequenceStep], len: usize) -> Vec<SequenceStep> {
    let mut out: Vec<SequenceStep> = steps.iter().take(len).copied().collect();
    out.resize(len, SequenceStep::PADDING);
    out
}

/// `len` consecutive steps of one product and the quantity that followed.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceWindow {
    pub product: ProductKey,
    pub steps: Vec<SequenceStep>,
    pub target: f64,
}

/// Slide a `len`-step window over each product's chronological rows.
///
/// Products with `len` rows or fewer contribute nothing. Windows come out
/// grouped by product key (ascending), chronological within a product.
pub fn build_windows(features: &FeatureSet, len: usize) -> Vec<SequenceWindow> {
    let records: Vec<_> = features.rows.iter().map(|r| r.record.clone()).collect();
    let mut windows = Vec::new();

    for (product, idxs) in group_chronologically(&records) {
        if idxs.len() <= len {
            continue;
        }
        let steps: Vec<SequenceStep> = idxs
            .iter()
            .map(|&i| {
                let row = &features.rows[i];
                SequenceStep::new(row.rolling_quantity, row.calendar)
            })
            .collect();

        for start in 0..idxs.len() - len {
            let target_row = &features.rows[idxs[start + len]];
            windows.push(SequenceWindow {
                product,
                steps: steps[start..start + len].to_vec(),
                target: target_row.record.quantity as f64,
            });
        }
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureConfig, engineer};
    use meditrust_core::{OrderRecord, Reordered};
    use proptest::prelude::*;

    fn history(per_product: &[(i64, usize)]) -> Vec<OrderRecord> {
        let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut out = Vec::new();
        let mut n = 0u64;
        for &(product, count) in per_product {
            for k in 0..count {
                out.push(
                    OrderRecord::new(
                        format!("ORD{n}"),
                        ProductKey::new(product),
                        base + chrono::Days::new(n),
                        10 * (k as i64 + 1),
                        Reordered::No,
                    )
                    .unwrap(),
                );
                n += 1;
            }
        }
        out
    }

    #[test]
    fn step_serializes_with_client_keys() {
        let v = serde_json::to_value(SequenceStep::PADDING).unwrap();
        assert_eq!(v["RollingQuantity"], 0.0);
        assert_eq!(v["DayOfWeek"], 0.0);
        assert_eq!(v["WeekOfYear"], 1.0);

        let step: SequenceStep = serde_json::from_str(
            r#"{"RollingQuantity": 3, "DayOfWeek": 2, "Month": 4, "Day": 9, "WeekOfYear": 15}"#,
        )
        .unwrap();
        assert_eq!(step.to_array(), [3.0, 2.0, 4.0, 9.0, 15.0]);
    }

    #[test]
    fn short_sequences_are_padded_with_default_step() {
        let one = SequenceStep::from_date(7.0, NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
        let out = pad_or_truncate(&[one], 5);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], one);
        assert!(out[1..].iter().all(|s| *s == SequenceStep::PADDING));
    }

    #[test]
    fn windows_pair_steps_with_next_quantity() {
        let features = engineer(&history(&[(1, 7), (2, 5), (3, 6)]), &FeatureConfig::training());
        let windows = build_windows(&features, 5);

        // 7 rows -> 2 windows, 5 rows -> none, 6 rows -> 1 window.
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].product, ProductKey::new(1));
        assert_eq!(windows[0].target, 60.0);
        assert_eq!(windows[1].target, 70.0);
        assert_eq!(windows[2].product, ProductKey::new(3));
        assert_eq!(windows[2].target, 60.0);
        assert!(windows.iter().all(|w| w.steps.len() == 5));
        // Rolling sum of the first step of the second window: 10 + 20.
        assert_eq!(windows[1].steps[0].rolling_quantity, 30.0);
    }

    proptest! {
        #[test]
        fn pad_or_truncate_always_yields_len(n in 0usize..20, len in 1usize..10) {
            let steps = vec![SequenceStep::from_date(1.0, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()); n];
            prop_assert_eq!(pad_or_truncate(&steps, len).len(), len);
        }

        #[test]
        fn window_count_is_len_minus_window(counts in prop::collection::vec(0usize..15, 1..6)) {
            let spec: Vec<(i64, usize)> = counts.iter().enumerate().map(|(i, c)| (i as i64 + 1, *c)).collect();
            let features = engineer(&history(&spec), &FeatureConfig::training());
            let expected: usize = counts.iter().map(|&c| c.saturating_sub(5)).sum();
            prop_assert_eq!(build_windows(&features, 5).len(), expected);
        }
    }
}
