//! On-disk artifact bundle.
//!
//! A trained model is persisted as one directory, loaded wholesale at
//! service start:
//!
//! ```text
//! <dir>/config.json          model architecture (DemandNetConfig)
//! <dir>/training.json        hyper-parameters used to train
//! <dir>/model.mpk            weights (CompactRecorder)
//! <dir>/seq_scaler.json      feature scaler
//! <dir>/y_scaler.json        target scaler
//! <dir>/label_encoder.json   product-key encoder
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use burn::{
    config::Config,
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::backend::Backend,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::encoder::LabelEncoder;
use crate::error::{ForecastError, ForecastResult};
use crate::model::{DemandNet, DemandNetConfig};
use crate::scaler::MinMaxScaler;
use crate::window::NUM_FEATURES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_config(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    pub fn training_config(&self) -> PathBuf {
        self.dir.join("training.json")
    }

    /// Without extension; the recorder appends its own.
    pub fn model(&self) -> PathBuf {
        self.dir.join("model")
    }

    pub fn seq_scaler(&self) -> PathBuf {
        self.dir.join("seq_scaler.json")
    }

    pub fn y_scaler(&self) -> PathBuf {
        self.dir.join("y_scaler.json")
    }

    pub fn label_encoder(&self) -> PathBuf {
        self.dir.join("label_encoder.json")
    }

    pub fn create_dir(&self) -> ForecastResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

/// Fitted transformers applied around the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessing {
    pub seq_scaler: MinMaxScaler,
    pub y_scaler: MinMaxScaler,
    pub encoder: LabelEncoder,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> ForecastResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ForecastResult<T> {
    let file = File::open(path)
        .map_err(|e| ForecastError::artifact(format!("{}: {e}", path.display())))?;
    Ok(serde_json::from_reader(file)?)
}

impl Preprocessing {
    pub fn save(&self, paths: &ArtifactPaths) -> ForecastResult<()> {
        write_json(&paths.seq_scaler(), &self.seq_scaler)?;
        write_json(&paths.y_scaler(), &self.y_scaler)?;
        write_json(&paths.label_encoder(), &self.encoder)?;
        Ok(())
    }

    /// Load and check the scaler widths against the model's input shape.
    pub fn load(paths: &ArtifactPaths) -> ForecastResult<Self> {
        let loaded = Self {
            seq_scaler: read_json(&paths.seq_scaler())?,
            y_scaler: read_json(&paths.y_scaler())?,
            encoder: read_json(&paths.label_encoder())?,
        };
        loaded.check_shapes()?;
        Ok(loaded)
    }

    fn check_shapes(&self) -> ForecastResult<()> {
        if !self.seq_scaler.is_well_formed() || !self.y_scaler.is_well_formed() {
            return Err(ForecastError::artifact("scaler min/max lengths differ"));
        }
        if self.seq_scaler.width() != NUM_FEATURES {
            return Err(ForecastError::artifact(format!(
                "sequence scaler has {} columns, expected {NUM_FEATURES}",
                self.seq_scaler.width()
            )));
        }
        if self.y_scaler.width() != 1 {
            return Err(ForecastError::artifact(format!(
                "target scaler has {} columns, expected 1",
                self.y_scaler.width()
            )));
        }
        Ok(())
    }
}

pub fn save_model<B: Backend>(
    paths: &ArtifactPaths,
    config: &DemandNetConfig,
    model: DemandNet<B>,
) -> ForecastResult<()> {
    config.save(paths.model_config())?;
    model
        .save_file(paths.model(), &CompactRecorder::new())
        .map_err(|e| ForecastError::artifact(format!("saving weights: {e}")))?;
    Ok(())
}

pub fn load_model<B: Backend>(
    paths: &ArtifactPaths,
    device: &B::Device,
) -> ForecastResult<(DemandNetConfig, DemandNet<B>)> {
    let config = DemandNetConfig::load(paths.model_config())
        .map_err(|e| ForecastError::artifact(format!("loading model config: {e}")))?;
    let record = CompactRecorder::new()
        .load(paths.model(), device)
        .map_err(|e| ForecastError::artifact(format!("loading weights: {e}")))?;
    let model = config.init::<B>(device).load_record(record);
    Ok((config, model))
}
