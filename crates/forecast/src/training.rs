//! Training pipeline: order history → windows → fitted preprocessing → model.

use burn::{
    config::Config,
    data::{dataloader::DataLoaderBuilder, dataset::InMemDataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{ElementConversion, backend::AutodiffBackend, backend::Backend},
};

use meditrust_core::OrderRecord;

use crate::artifacts::{ArtifactPaths, Preprocessing, save_model};
use crate::data::{SequenceBatch, SequenceBatcher, SequenceItem};
use crate::encoder::LabelEncoder;
use crate::error::{ForecastError, ForecastResult};
use crate::features::{FeatureConfig, engineer};
use crate::model::{DemandNet, DemandNetConfig};
use crate::scaler::MinMaxScaler;
use crate::window::{DEFAULT_SEQUENCE_LEN, SequenceWindow, build_windows};

#[derive(Config)]
pub struct TrainingConfig {
    pub model: DemandNetConfig,
    pub optimizer: AdamConfig,
    #[config(default = 5)]
    pub sequence_len: usize,
    #[config(default = 100)]
    pub num_epochs: usize,
    #[config(default = 32)]
    pub batch_size: usize,
    #[config(default = 1)]
    pub num_workers: usize,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = 1.0e-4)]
    pub learning_rate: f64,
    /// Fraction of windows (chronologically first) used for training.
    #[config(default = 0.9)]
    pub split_val: f32,
    /// Epochs without validation improvement before stopping.
    #[config(default = 5)]
    pub patience: usize,
}

impl TrainingConfig {
    pub fn with_defaults() -> Self {
        Self::new(DemandNetConfig::new(), AdamConfig::new()).with_sequence_len(DEFAULT_SEQUENCE_LEN)
    }

    pub(crate) fn load_sequence_len(paths: &ArtifactPaths) -> Option<usize> {
        Self::load(paths.training_config()).ok().map(|c| c.sequence_len)
    }
}

/// Everything needed to fit the network, derived from raw history.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub preprocessing: Preprocessing,
    pub train: Vec<SequenceItem>,
    pub valid: Vec<SequenceItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub windows: usize,
    pub products: usize,
    pub epochs_run: usize,
    pub best_epoch: usize,
    /// Mean absolute error on the validation split, in scaled target units.
    pub best_valid_mae: f64,
    /// Validation MAE per epoch run, in order.
    pub valid_history: Vec<f64>,
}

/// Outcome of one epoch as seen by [`EarlyStopping`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EpochVerdict {
    /// New best validation loss; keep these weights.
    Improved,
    /// No improvement, patience not yet exhausted.
    Stale,
    /// Patience exhausted; stop training.
    Stop,
}

/// Patience-based stopping on validation loss.
///
/// Only a strictly lower loss counts as an improvement.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best: Option<(f64, usize)>,
    stale: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: None,
            stale: 0,
        }
    }

    pub fn observe(&mut self, epoch: usize, loss: f64) -> EpochVerdict {
        let improved = self.best.map(|(b, _)| loss < b).unwrap_or(true);
        if improved {
            self.best = Some((loss, epoch));
            self.stale = 0;
            return EpochVerdict::Improved;
        }
        self.stale += 1;
        if self.stale >= self.patience {
            EpochVerdict::Stop
        } else {
            EpochVerdict::Stale
        }
    }

    /// Best `(loss, epoch)` seen so far.
    pub fn best(&self) -> Option<(f64, usize)> {
        self.best
    }

    /// Replay per-epoch losses (epochs numbered from 1); returns
    /// `(best_epoch, last_epoch_run)`.
    pub fn replay(losses: &[f64], patience: usize) -> (usize, usize) {
        let mut stopper = Self::new(patience);
        let mut last = 0;
        for (i, &loss) in losses.iter().enumerate() {
            last = i + 1;
            if stopper.observe(last, loss) == EpochVerdict::Stop {
                break;
            }
        }
        (stopper.best().map(|(_, e)| e).unwrap_or(0), last)
    }
}

fn encode_windows(
    windows: &[SequenceWindow],
    preprocessing: &Preprocessing,
) -> ForecastResult<Vec<SequenceItem>> {
    windows
        .iter()
        .map(|w| {
            let mut steps = Vec::with_capacity(w.steps.len() * crate::NUM_FEATURES);
            for step in &w.steps {
                let scaled = preprocessing.seq_scaler.transform(&step.to_array())?;
                steps.extend(scaled.into_iter().map(|v| v as f32));
            }
            Ok(SequenceItem {
                steps,
                product_index: preprocessing.encoder.transform(w.product)?,
                target: preprocessing.y_scaler.transform_scalar(w.target)? as f32,
            })
        })
        .collect()
}

/// Engineer, window, fit transformers, and split chronologically.
pub fn prepare(records: &[OrderRecord], config: &TrainingConfig) -> ForecastResult<PreparedData> {
    let features = engineer(records, &FeatureConfig::training());
    let windows = build_windows(&features, config.sequence_len);

    if windows.is_empty() {
        return Err(ForecastError::InsufficientData(format!(
            "no valid sequences created; every product needs more than {} orders",
            config.sequence_len
        )));
    }

    let encoder = LabelEncoder::fit(features.rows.iter().map(|r| r.record.product));

    let step_rows: Vec<[f64; crate::NUM_FEATURES]> = windows
        .iter()
        .flat_map(|w| w.steps.iter().map(|s| s.to_array()))
        .collect();
    let seq_scaler = MinMaxScaler::fit(step_rows.iter().map(|r| r.as_slice()))?;

    let targets: Vec<[f64; 1]> = windows.iter().map(|w| [w.target]).collect();
    let y_scaler = MinMaxScaler::fit(targets.iter().map(|t| t.as_slice()))?;

    let preprocessing = Preprocessing {
        seq_scaler,
        y_scaler,
        encoder,
    };

    let mut items = encode_windows(&windows, &preprocessing)?;

    let split = ((items.len() as f32 * config.split_val) as usize).clamp(1, items.len());
    let valid = items.split_off(split);

    tracing::info!(
        windows = windows.len(),
        train = items.len(),
        valid = valid.len(),
        products = preprocessing.encoder.len(),
        "prepared training windows"
    );

    Ok(PreparedData {
        preprocessing,
        train: items,
        valid,
    })
}

fn mae<B: Backend>(model: &DemandNet<B>, batch: SequenceBatch<B>) -> burn::tensor::Tensor<B, 1> {
    let output = model.forward(batch.sequences, batch.products);
    (output - batch.targets).abs().mean()
}

fn evaluate<B: Backend>(
    model: &DemandNet<B>,
    items: &[SequenceItem],
    batch_size: usize,
    device: &B::Device,
) -> f64 {
    use burn::data::dataloader::batcher::Batcher;

    let batcher = SequenceBatcher::<B>::new(device.clone());
    let mut total = 0.0;
    let mut count = 0usize;

    for chunk in items.chunks(batch_size.max(1)) {
        let loss: f64 = mae(model, batcher.batch(chunk.to_vec())).into_scalar().elem();
        total += loss * chunk.len() as f64;
        count += chunk.len();
    }

    if count == 0 { f64::NAN } else { total / count as f64 }
}

/// Train the regressor and write the full artifact bundle to `paths`.
///
/// Loss is mean absolute error on scaled targets. Training stops after
/// `patience` epochs without validation improvement and the best weights are
/// kept. When the validation split is empty, training loss drives stopping.
pub fn train<B: AutodiffBackend>(
    paths: &ArtifactPaths,
    records: &[OrderRecord],
    config: TrainingConfig,
    device: &B::Device,
) -> ForecastResult<TrainingReport> {
    let prepared = prepare(records, &config)?;
    let windows = prepared.train.len() + prepared.valid.len();
    let products = prepared.preprocessing.encoder.len();

    let model_config = config.model.clone().with_num_products(products);
    let config = TrainingConfig {
        model: model_config.clone(),
        ..config
    };

    paths.create_dir()?;
    config.save(paths.training_config())?;
    prepared.preprocessing.save(paths)?;

    B::seed(config.seed);

    let mut model: DemandNet<B> = model_config.init::<B>(device);
    let mut optim = config.optimizer.init();

    let dataloader_train = DataLoaderBuilder::new(SequenceBatcher::<B>::new(device.clone()))
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(InMemDataset::new(prepared.train.clone()));

    let mut stopper = EarlyStopping::new(config.patience);
    let mut best_model: Option<DemandNet<B>> = None;
    let mut valid_history = Vec::new();
    let mut epochs_run = 0usize;

    for epoch in 1..=config.num_epochs {
        epochs_run = epoch;
        let mut train_total = 0.0;
        let mut train_count = 0usize;

        for batch in dataloader_train.iter() {
            let [n, _] = batch.targets.dims();
            let loss = mae(&model, batch);
            train_total += loss.clone().into_scalar().elem::<f64>() * n as f64;
            train_count += n;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(config.learning_rate, model, grads);
        }

        let train_mae = train_total / train_count.max(1) as f64;
        let valid_mae = if prepared.valid.is_empty() {
            train_mae
        } else {
            evaluate::<B::InnerBackend>(&model.valid(), &prepared.valid, config.batch_size, device)
        };
        valid_history.push(valid_mae);

        tracing::info!(epoch, train_mae, valid_mae, "epoch finished");

        match stopper.observe(epoch, valid_mae) {
            EpochVerdict::Improved => best_model = Some(model.clone()),
            EpochVerdict::Stale => {}
            EpochVerdict::Stop => {
                tracing::info!(epoch, patience = config.patience, "early stopping");
                break;
            }
        }
    }

    let (best_valid_mae, best_epoch) = stopper.best().unwrap_or((f64::NAN, 0));
    let best_model = best_model.unwrap_or(model);

    tracing::info!(best_epoch, best_valid_mae, "validation MAE of kept weights");

    save_model(paths, &model_config, best_model.valid())?;

    Ok(TrainingReport {
        windows,
        products,
        epochs_run,
        best_epoch,
        best_valid_mae,
        valid_history,
    })
}
