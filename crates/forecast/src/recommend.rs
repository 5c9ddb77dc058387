//! Per-user demand ranking over order history.

use serde::Serialize;

use meditrust_core::{OrderLine, ProductKey};

use crate::predictor::DemandForecaster;
use crate::window::SequenceStep;

/// How many of a user's most recent order lines feed the ranking.
pub const HISTORY_LIMIT: usize = 50;

/// How many products a recommendation returns.
pub const TOP_N: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub product: ProductKey,
    pub predicted_quantity: f64,
}

/// Group history lines per product, in first-seen order.
///
/// Each line becomes one step with a unit rolling quantity and the calendar
/// features of its order date.
pub fn history_sequences(lines: &[OrderLine]) -> Vec<(ProductKey, Vec<SequenceStep>)> {
    let mut groups: Vec<(ProductKey, Vec<SequenceStep>)> = Vec::new();
    for line in lines {
        let step = SequenceStep::from_date(1.0, line.ordered_at.date());
        match groups.iter_mut().find(|(p, _)| *p == line.product) {
            Some((_, steps)) => steps.push(step),
            None => groups.push((line.product, vec![step])),
        }
    }
    groups
}

/// Predict every product in `lines` and keep the `top_n` highest.
///
/// Products outside the model's vocabulary, or whose prediction fails, are
/// skipped. Ties keep history order.
pub fn rank_user_history(
    forecaster: &dyn DemandForecaster,
    lines: &[OrderLine],
    top_n: usize,
) -> Vec<Prediction> {
    let mut predictions: Vec<Prediction> = Vec::new();

    for (product, steps) in history_sequences(lines) {
        if !forecaster.knows(product) {
            tracing::info!(%product, "product unknown to demand model; skipping");
            continue;
        }
        match forecaster.predict(product, &steps) {
            Ok(predicted_quantity) => predictions.push(Prediction {
                product,
                predicted_quantity,
            }),
            Err(err) => {
                tracing::warn!(%product, %err, "prediction failed; skipping product");
            }
        }
    }

    // Stable sort: equal predictions keep first-seen order.
    predictions.sort_by(|a, b| b.predicted_quantity.total_cmp(&a.predicted_quantity));
    predictions.truncate(top_n);
    predictions
}
