//! `meditrust-forecast`
//!
//! **Responsibility:** demand-forecasting subsystem.
//!
//! - Feature engineering over order history (calendar, rolling, lag features).
//! - Sequence windowing and the fitted preprocessing (scalers, product encoder).
//! - The recurrent + embedding regressor, its training loop and artifact bundle.
//! - Inference behind the [`DemandForecaster`] trait, including per-user ranking.
//!
//! This crate does no database or HTTP work; inputs are provided by callers.

pub mod artifacts;
pub mod data;
pub mod encoder;
pub mod error;
pub mod features;
pub mod generator;
pub mod history;
pub mod model;
pub mod predictor;
pub mod recommend;
pub mod scaler;
pub mod training;
pub mod window;

pub use artifacts::{ArtifactPaths, Preprocessing};
pub use encoder::LabelEncoder;
pub use error::{ForecastError, ForecastResult};
pub use features::{CalendarFeatures, EngineeredOrder, FeatureConfig, FeatureSet, RollingKind};
pub use generator::{GeneratorConfig, OrderGenerator};
pub use model::{DemandNet, DemandNetConfig};
pub use predictor::{DemandForecaster, DemandPredictor};
pub use recommend::{Prediction, rank_user_history};
pub use scaler::MinMaxScaler;
pub use training::{EarlyStopping, EpochVerdict, TrainingConfig, TrainingReport};
pub use window::{SequenceStep, SequenceWindow, NUM_FEATURES, pad_or_truncate};

/// CPU backend used for inference.
pub type InferenceBackend = burn::backend::NdArray;

/// Autodiff wrapper used for training.
pub type TrainingBackend = burn::backend::Autodiff<InferenceBackend>;

/// Round a prediction to two decimals, as served to clients.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
