use burn::{
    config::Config,
    module::Module,
    nn::{
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig, Lstm,
        LstmConfig, Relu,
    },
    tensor::{Int, Tensor, backend::Backend},
};

use crate::window::NUM_FEATURES;

/// Recurrent sequence encoder + product embedding regressor.
#[derive(Config, Debug)]
pub struct DemandNetConfig {
    /// Vocabulary size of the product embedding (set from the fitted encoder).
    #[config(default = 1)]
    pub num_products: usize,
    #[config(default = 5)]
    pub num_features: usize,
    #[config(default = 64)]
    pub lstm_hidden: usize,
    #[config(default = 8)]
    pub embedding_dim: usize,
    #[config(default = 64)]
    pub dense_hidden: usize,
    #[config(default = 0.2)]
    pub embedding_dropout: f64,
    #[config(default = 0.3)]
    pub dropout: f64,
}

impl DemandNetConfig {
    pub fn for_products(num_products: usize) -> Self {
        Self::new()
            .with_num_products(num_products.max(1))
            .with_num_features(NUM_FEATURES)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> DemandNet<B> {
        DemandNet {
            lstm: LstmConfig::new(self.num_features, self.lstm_hidden, true).init(device),
            embedding: EmbeddingConfig::new(self.num_products, self.embedding_dim).init(device),
            embedding_dropout: DropoutConfig::new(self.embedding_dropout).init(),
            hidden: LinearConfig::new(self.lstm_hidden + self.embedding_dim, self.dense_hidden)
                .with_bias(true)
                .init(device),
            activation: Relu::new(),
            dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(self.dense_hidden, 1)
                .with_bias(true)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct DemandNet<B: Backend> {
    lstm: Lstm<B>,
    embedding: Embedding<B>,
    embedding_dropout: Dropout,
    hidden: Linear<B>,
    activation: Relu,
    dropout: Dropout,
    output: Linear<B>,
}

impl<B: Backend> DemandNet<B> {
    /// `sequences`: `[batch, seq_len, features]`, `products`: `[batch, 1]`.
    ///
    /// Returns the scaled quantity prediction, `[batch, 1]`.
    pub fn forward(&self, sequences: Tensor<B, 3>, products: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch, _, _] = sequences.dims();

        // Final hidden state summarises the sequence.
        let (_, state) = self.lstm.forward(sequences, None);
        let encoded = state.hidden;

        let embedded = self.embedding.forward(products);
        let embedded = self.embedding_dropout.forward(embedded);
        let [_, _, dim] = embedded.dims();
        let embedded = embedded.reshape([batch, dim]);

        let x = Tensor::cat(vec![encoded, embedded], 1);
        let x = self.activation.forward(self.hidden.forward(x));
        let x = self.dropout.forward(x);
        self.output.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InferenceBackend;
    use burn::tensor::TensorData;

    #[test]
    fn forward_produces_one_value_per_batch_row() {
        let device = Default::default();
        let model = DemandNetConfig::for_products(4).init::<InferenceBackend>(&device);

        let sequences = Tensor::<InferenceBackend, 3>::zeros([3, 5, NUM_FEATURES], &device);
        let products = Tensor::<InferenceBackend, 2, Int>::from_data(
            TensorData::new(vec![0i64, 2, 3], [3, 1]),
            &device,
        );

        let out = model.forward(sequences, products);
        assert_eq!(out.dims(), [3, 1]);
    }

    #[test]
    fn config_defaults_match_architecture() {
        let c = DemandNetConfig::for_products(0);
        assert_eq!(c.num_products, 1);
        assert_eq!(c.lstm_hidden, 64);
        assert_eq!(c.embedding_dim, 8);
        assert_eq!(c.dense_hidden, 64);
        assert_eq!(c.num_features, NUM_FEATURES);
    }
}
