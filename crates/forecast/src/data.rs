use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{Int, Tensor, TensorData, backend::Backend},
};
use serde::{Deserialize, Serialize};

use crate::window::NUM_FEATURES;

/// A scaled, encoded training example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceItem {
    /// Row-major `[seq_len, NUM_FEATURES]`, already scaled.
    pub steps: Vec<f32>,
    pub product_index: usize,
    /// Scaled target.
    pub target: f32,
}

impl SequenceItem {
    pub fn seq_len(&self) -> usize {
        self.steps.len() / NUM_FEATURES
    }
}

#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

#[derive(Clone, Debug)]
pub struct SequenceBatch<B: Backend> {
    pub sequences: Tensor<B, 3>,
    pub products: Tensor<B, 2, Int>,
    pub targets: Tensor<B, 2>,
}

impl<B: Backend> Batcher<SequenceItem, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceItem>) -> SequenceBatch<B> {
        let batch = items.len();
        let seq_len = items.first().map(|i| i.seq_len()).unwrap_or(0);

        let steps: Vec<f32> = items.iter().flat_map(|i| i.steps.iter().copied()).collect();
        let products: Vec<i64> = items.iter().map(|i| i.product_index as i64).collect();
        let targets: Vec<f32> = items.iter().map(|i| i.target).collect();

        let sequences = Tensor::<B, 3>::from_data(
            TensorData::new(steps, [batch, seq_len, NUM_FEATURES]),
            &self.device,
        );
        let products =
            Tensor::<B, 2, Int>::from_data(TensorData::new(products, [batch, 1]), &self.device);
        let targets = Tensor::<B, 2>::from_data(TensorData::new(targets, [batch, 1]), &self.device);

        SequenceBatch {
            sequences,
            products,
            targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InferenceBackend;

    #[test]
    fn batch_shapes_follow_items() {
        let item = SequenceItem {
            steps: vec![0.5; 5 * NUM_FEATURES],
            product_index: 1,
            target: 0.25,
        };
        let batcher = SequenceBatcher::<InferenceBackend>::new(Default::default());
        let batch = batcher.batch(vec![item.clone(), item]);

        assert_eq!(batch.sequences.dims(), [2, 5, NUM_FEATURES]);
        assert_eq!(batch.products.dims(), [2, 1]);
        assert_eq!(batch.targets.dims(), [2, 1]);
    }
}
