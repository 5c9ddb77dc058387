use meditrust_core::{DomainError, ProductKey};
use thiserror::Error;

pub type ForecastResult<T> = Result<T, ForecastError>;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The product key was not part of the encoder's trained vocabulary.
    #[error("product id \"{0}\" not recognized")]
    UnknownProduct(ProductKey),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ForecastError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }
}
