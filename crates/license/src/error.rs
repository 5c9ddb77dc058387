use thiserror::Error;

pub type LicenseResult<T> = Result<T, LicenseError>;

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Model directory missing or incomplete.
    #[error("model load failed: {0}")]
    Load(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("inference failed: {0}")]
    Inference(#[from] candle_core::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LicenseError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }
}
