//! BERT sequence classifier for license numbers.
//!
//! Expected model directory layout (Hugging Face export):
//!
//! ```text
//! <dir>/config.json
//! <dir>/model.safetensors   (or pytorch_model.bin)
//! <dir>/tokenizer.json
//! ```

use std::path::Path;

use candle_core::{D, DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder, linear};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::error::{LicenseError, LicenseResult};
use crate::{LicenseClassifier, LicenseVerdict};

/// Every input is padded or truncated to this many tokens.
pub const MAX_TOKENS: usize = 20;

/// Classification-head fields of `config.json` that [`BertConfig`] ignores.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    hidden_size: usize,
    #[serde(default)]
    id2label: Option<serde_json::Map<String, serde_json::Value>>,
}

impl HeadConfig {
    fn num_labels(&self) -> usize {
        self.id2label.as_ref().map(|m| m.len()).unwrap_or(2).max(2)
    }
}

pub struct BertLicenseClassifier {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl BertLicenseClassifier {
    /// Load config, weights and tokenizer from a model directory.
    pub fn load(dir: &Path) -> LicenseResult<Self> {
        let device = Device::Cpu;

        let config_path = dir.join("config.json");
        let config_json = std::fs::read_to_string(&config_path)
            .map_err(|e| LicenseError::load(format!("{}: {e}", config_path.display())))?;

        let tokenizer_path = dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| LicenseError::load(format!("{}: {e}", tokenizer_path.display())))?;

        let safetensors = dir.join("model.safetensors");
        let pth = dir.join("pytorch_model.bin");
        let vb = if safetensors.exists() {
            let bytes = std::fs::read(&safetensors)
                .map_err(|e| LicenseError::load(format!("{}: {e}", safetensors.display())))?;
            VarBuilder::from_buffered_safetensors(bytes, DType::F32, &device)
                .map_err(|e| LicenseError::load(format!("{}: {e}", safetensors.display())))?
        } else if pth.exists() {
            VarBuilder::from_pth(&pth, DType::F32, &device)
                .map_err(|e| LicenseError::load(format!("{}: {e}", pth.display())))?
        } else {
            return Err(LicenseError::load(format!(
                "no model.safetensors or pytorch_model.bin in {}",
                dir.display()
            )));
        };

        let classifier = Self::from_parts(vb, &config_json, tokenizer, device)?;
        tracing::info!(dir = %dir.display(), "license classifier loaded");
        Ok(classifier)
    }

    /// Build from an already-open variable store.
    ///
    /// Tensor names follow `BertForSequenceClassification`: the encoder under
    /// `bert.`, the pooler under `bert.pooler.dense` and the head under
    /// `classifier`.
    pub fn from_parts(
        vb: VarBuilder,
        config_json: &str,
        mut tokenizer: Tokenizer,
        device: Device,
    ) -> LicenseResult<Self> {
        let config: BertConfig = serde_json::from_str(config_json)?;
        let head: HeadConfig = serde_json::from_str(config_json)?;
        let hidden = head.hidden_size;

        let missing = |e: candle_core::Error| LicenseError::load(format!("weights: {e}"));
        let bert = BertModel::load(vb.pp("bert"), &config).map_err(missing)?;
        let pooler = linear(hidden, hidden, vb.pp("bert").pp("pooler").pp("dense")).map_err(missing)?;
        let classifier = linear(hidden, head.num_labels(), vb.pp("classifier")).map_err(missing)?;

        tokenizer
            .with_padding(Some(PaddingParams {
                strategy: PaddingStrategy::Fixed(MAX_TOKENS),
                ..Default::default()
            }))
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| LicenseError::Tokenizer(e.to_string()))?;

        Ok(Self {
            bert,
            pooler,
            classifier,
            tokenizer,
            device,
        })
    }

    /// Token ids, type ids and attention mask, each `[1, MAX_TOKENS]`.
    fn encode(&self, text: &str) -> LicenseResult<(Tensor, Tensor, Tensor)> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| LicenseError::Tokenizer(e.to_string()))?;

        let ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        Ok((ids, type_ids, mask))
    }

    fn logits(&self, text: &str) -> LicenseResult<Tensor> {
        let (ids, type_ids, mask) = self.encode(text)?;
        let sequence = self.bert.forward(&ids, &type_ids, Some(&mask))?;
        let cls = sequence.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        Ok(self.classifier.forward(&pooled)?)
    }
}

impl LicenseClassifier for BertLicenseClassifier {
    fn classify(&self, license_number: &str) -> LicenseResult<LicenseVerdict> {
        let text = license_number.trim();
        if text.is_empty() {
            return Err(LicenseError::InvalidInput("license number is empty".into()));
        }

        let label = self
            .logits(text)?
            .argmax(D::Minus1)?
            .to_vec1::<u32>()?
            .first()
            .copied()
            .ok_or_else(|| LicenseError::Inference(candle_core::Error::Msg("empty logits".into())))?;

        let verdict = LicenseVerdict::from_label(label);
        tracing::debug!(label, ?verdict, "license classified");
        Ok(verdict)
    }
}
