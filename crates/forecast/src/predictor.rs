//! Inference over a loaded artifact bundle.

use std::sync::Mutex;

use burn::tensor::{Int, Tensor, TensorData, backend::Backend};

use meditrust_core::ProductKey;

use crate::artifacts::{ArtifactPaths, Preprocessing, load_model};
use crate::error::{ForecastError, ForecastResult};
use crate::model::DemandNet;
use crate::round2;
use crate::window::{DEFAULT_SEQUENCE_LEN, NUM_FEATURES, SequenceStep, pad_or_truncate};

/// A demand model as seen by request handlers.
///
/// Implementations must be shareable read-only across requests.
pub trait DemandForecaster: Send + Sync + 'static {
    /// Whether `product` is part of the trained vocabulary.
    fn knows(&self, product: ProductKey) -> bool;

    /// Predicted next-order quantity for `product` given its recent steps.
    ///
    /// `steps` is padded or truncated to the model's window. Unknown products
    /// fail with [`ForecastError::UnknownProduct`].
    fn predict(&self, product: ProductKey, steps: &[SequenceStep]) -> ForecastResult<f64>;
}

/// The trained network plus its fitted preprocessing.
pub struct DemandPredictor<B: Backend> {
    // Inference is serialised; the lock also makes the module shareable.
    model: Mutex<DemandNet<B>>,
    preprocessing: Preprocessing,
    sequence_len: usize,
    device: B::Device,
}

impl<B: Backend> DemandPredictor<B> {
    pub fn new(
        model: DemandNet<B>,
        preprocessing: Preprocessing,
        sequence_len: usize,
        device: B::Device,
    ) -> Self {
        Self {
            model: Mutex::new(model),
            preprocessing,
            sequence_len,
            device,
        }
    }

    /// Load the whole bundle written by [`crate::training::train`].
    pub fn load(paths: &ArtifactPaths, device: B::Device) -> ForecastResult<Self> {
        let (_config, model) = load_model::<B>(paths, &device)?;
        let preprocessing = Preprocessing::load(paths)?;

        let sequence_len = match crate::training::TrainingConfig::load_sequence_len(paths) {
            Some(len) => len,
            None => {
                tracing::warn!(
                    dir = %paths.dir().display(),
                    "training.json missing or unreadable; assuming default window"
                );
                DEFAULT_SEQUENCE_LEN
            }
        };

        tracing::info!(
            dir = %paths.dir().display(),
            products = preprocessing.encoder.len(),
            sequence_len,
            "demand model loaded"
        );

        Ok(Self::new(model, preprocessing, sequence_len, device))
    }

    fn scaled_input(&self, steps: &[SequenceStep]) -> ForecastResult<Vec<f32>> {
        let padded = pad_or_truncate(steps, self.sequence_len);
        let mut flat = Vec::with_capacity(self.sequence_len * NUM_FEATURES);
        for step in &padded {
            let scaled = self.preprocessing.seq_scaler.transform(&step.to_array())?;
            flat.extend(scaled.into_iter().map(|v| v as f32));
        }
        Ok(flat)
    }
}

impl<B: Backend> DemandForecaster for DemandPredictor<B> {
    fn knows(&self, product: ProductKey) -> bool {
        self.preprocessing.encoder.contains(product)
    }

    fn predict(&self, product: ProductKey, steps: &[SequenceStep]) -> ForecastResult<f64> {
        let index = self.preprocessing.encoder.transform(product)?;
        let flat = self.scaled_input(steps)?;

        let sequences = Tensor::<B, 3>::from_data(
            TensorData::new(flat, [1, self.sequence_len, NUM_FEATURES]),
            &self.device,
        );
        let products = Tensor::<B, 2, Int>::from_data(
            TensorData::new(vec![index as i64], [1, 1]),
            &self.device,
        );

        let output = {
            let model = self
                .model
                .lock()
                .map_err(|_| ForecastError::InferenceFailed("model lock poisoned".into()))?;
            model.forward(sequences, products)
        };

        let values = output
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ForecastError::InferenceFailed(format!("{e:?}")))?;
        let scaled = values
            .first()
            .copied()
            .ok_or_else(|| ForecastError::InferenceFailed("empty model output".into()))?;

        let quantity = self.preprocessing.y_scaler.inverse_scalar(scaled as f64)?;
        Ok(round2(quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InferenceBackend;
    use crate::encoder::LabelEncoder;
    use crate::model::DemandNetConfig;
    use crate::scaler::MinMaxScaler;
    use chrono::NaiveDate;

    fn predictor() -> DemandPredictor<InferenceBackend> {
        let device = Default::default();
        let rows = [vec![0.0, 0.0, 1.0, 1.0, 1.0], vec![250.0, 6.0, 12.0, 31.0, 53.0]];
        let preprocessing = Preprocessing {
            seq_scaler: MinMaxScaler::fit(rows.iter().map(|r| r.as_slice())).unwrap(),
            y_scaler: MinMaxScaler::fit([[10.0].as_slice(), [50.0].as_slice()]).unwrap(),
            encoder: LabelEncoder::fit([11, 12].map(ProductKey::new)),
        };
        let model = DemandNetConfig::for_products(2).init::<InferenceBackend>(&device);
        DemandPredictor::new(model, preprocessing, 5, device)
    }

    #[test]
    fn unknown_product_is_rejected() {
        let p = predictor();
        assert!(!p.knows(ProductKey::new(99)));
        assert!(matches!(
            p.predict(ProductKey::new(99), &[]),
            Err(ForecastError::UnknownProduct(_))
        ));
    }

    #[test]
    fn prediction_is_finite_and_rounded() {
        let p = predictor();
        let step = SequenceStep::from_date(20.0, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        let q = p.predict(ProductKey::new(11), &[step]).unwrap();
        assert!(q.is_finite());
        assert_eq!(q, round2(q));
    }

    #[test]
    fn padding_and_truncation_give_same_shape() {
        let p = predictor();
        let step = SequenceStep::from_date(20.0, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(p.scaled_input(&[]).unwrap().len(), 5 * NUM_FEATURES);
        assert_eq!(p.scaled_input(&vec![step; 9]).unwrap().len(), 5 * NUM_FEATURES);
    }

    #[test]
    fn prediction_is_deterministic() {
        let p = predictor();
        let a = p.predict(ProductKey::new(12), &[]).unwrap();
        let b = p.predict(ProductKey::new(12), &[]).unwrap();
        assert_eq!(a, b);
    }
}
