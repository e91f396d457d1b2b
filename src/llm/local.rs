//! Local T5 seq2seq backend on candle.
//!
//! Weights and tokenizer are loaded once at startup. Each request clones the
//! model handle (tensors are reference-counted) and decodes on the blocking
//! thread pool; a semaphore bounds how many decodes run at once.

use crate::config::{DeviceChoice, LocalModelConfig};
use crate::llm::backend::{BackendKind, Completion, InferenceBackend};
use crate::llm::beam::BeamSearch;
use crate::llm::hub::{ModelFiles, Weights};
use crate::prompt::Prompt;
use crate::types::{Result, Text2SqlError};
use async_trait::async_trait;
use candle::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use candle_transformers::models::t5::{self, T5ForConditionalGeneration};
use std::sync::Arc;
use tokenizers::Tokenizer;
use tokio::sync::Semaphore;
use tracing::{debug, info};

const BACKEND: &str = "local";

/// Fixed decoding settings for one model instance.
#[derive(Debug, Clone, Copy)]
struct DecodeSettings {
    max_input_tokens: usize,
    num_beams: usize,
    length_penalty: f32,
    start_token: u32,
    eos_token: u32,
}

/// Locally loaded T5-family model.
pub struct LocalSeq2SeqModel {
    name: String,
    model: T5ForConditionalGeneration,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    settings: DecodeSettings,
    max_output_tokens: usize,
    workers: Arc<Semaphore>,
}

impl LocalSeq2SeqModel {
    /// Load model, tokenizer and weights.
    ///
    /// Blocking; call once at startup.
    ///
    /// # Errors
    ///
    /// Returns `Text2SqlError::ConfigError` if files are missing or cannot
    /// be loaded
    pub fn load(config: &LocalModelConfig) -> Result<Self> {
        let files = ModelFiles::resolve(config)?;
        let name = config
            .model_id
            .clone()
            .or_else(|| {
                config
                    .model_dir
                    .as_ref()
                    .map(|d| d.display().to_string())
            })
            .unwrap_or_else(|| "t5".to_string());

        let device = match config.device {
            DeviceChoice::Auto => Device::cuda_if_available(0).map_err(load_err)?,
            DeviceChoice::Cpu => Device::Cpu,
        };

        let mut model_config: t5::Config =
            serde_json::from_str(&std::fs::read_to_string(&files.config)?).map_err(|e| {
                Text2SqlError::config(format!("invalid {}: {}", files.config.display(), e))
            })?;
        // every beam step re-decodes its full prefix, so no kv cache is kept
        model_config.use_cache = false;

        let tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(|e| {
            Text2SqlError::config(format!(
                "failed to load tokenizer {}: {}",
                files.tokenizer.display(),
                e
            ))
        })?;

        info!(model = %name, weights = %files.weights.path().display(), ?device, "loading seq2seq model");
        let vb = match &files.weights {
            // SAFETY: the weights file is not modified while mapped
            Weights::Safetensors(path) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device)
            },
            Weights::Pytorch(path) => VarBuilder::from_pth(path, DType::F32, &device),
        }
        .map_err(load_err)?;
        let model = T5ForConditionalGeneration::load(vb, &model_config).map_err(load_err)?;

        let settings = DecodeSettings {
            max_input_tokens: config.max_input_tokens,
            num_beams: config.num_beams,
            length_penalty: config.length_penalty,
            start_token: decoder_start_token(
                model_config.decoder_start_token_id,
                model_config.pad_token_id,
            ),
            eos_token: model_config.eos_token_id as u32,
        };
        info!(model = %name, num_beams = settings.num_beams, "seq2seq model ready");

        Ok(Self {
            name,
            model,
            tokenizer: Arc::new(tokenizer),
            device,
            settings,
            max_output_tokens: config.max_output_tokens,
            workers: Arc::new(Semaphore::new(config.max_concurrent_inferences)),
        })
    }
}

#[async_trait]
impl InferenceBackend for LocalSeq2SeqModel {
    async fn generate(&self, prompt: &Prompt, max_output_tokens: usize) -> Result<Completion> {
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Text2SqlError::inference(BACKEND, "worker pool closed"))?;

        let model = self.model.clone();
        let tokenizer = Arc::clone(&self.tokenizer);
        let device = self.device.clone();
        let settings = self.settings;
        let text = prompt.text.clone();

        tokio::task::spawn_blocking(move || {
            // held until decoding finishes, even if the caller timed out
            let _permit = permit;
            decode(model, &tokenizer, &device, settings, &text, max_output_tokens)
        })
        .await
        .map_err(|e| Text2SqlError::inference(BACKEND, format!("worker failed: {}", e)))?
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn model_name(&self) -> &str {
        &self.name
    }

    fn default_max_output_tokens(&self) -> usize {
        self.max_output_tokens
    }
}

/// Tokenize, encode, beam-search and detokenize one prompt.
fn decode(
    mut model: T5ForConditionalGeneration,
    tokenizer: &Tokenizer,
    device: &Device,
    settings: DecodeSettings,
    text: &str,
    max_output_tokens: usize,
) -> Result<Completion> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| Text2SqlError::inference(BACKEND, format!("tokenizer error: {}", e)))?;
    let input_ids = truncate_input(
        encoding.get_ids().to_vec(),
        settings.max_input_tokens,
        settings.eos_token,
    );
    debug!(input_tokens = input_ids.len(), "encoding prompt");

    let input = Tensor::new(input_ids.as_slice(), device)
        .and_then(|t| t.unsqueeze(0))
        .map_err(tensor_err)?;
    let encoder_output = model.encode(&input).map_err(tensor_err)?;

    let search = BeamSearch::new(settings.num_beams, max_output_tokens, settings.eos_token)
        .with_length_penalty(settings.length_penalty);
    let best = search.run(settings.start_token, |prefix| {
        next_token_log_probs(&mut model, prefix, &encoder_output, device).map_err(tensor_err)
    })?;

    let sql = tokenizer
        .decode(&best.tokens, true)
        .map_err(|e| Text2SqlError::inference(BACKEND, format!("detokenizer error: {}", e)))?;

    Ok(Completion {
        text: sql,
        score: Some(best.score),
    })
}

/// Cut an over-long encoding to `max` ids, keeping EOS as the final id.
fn truncate_input(mut ids: Vec<u32>, max: usize, eos: u32) -> Vec<u32> {
    if ids.len() > max {
        ids.truncate(max);
        if let Some(last) = ids.last_mut() {
            *last = eos;
        }
    }
    ids
}

/// T5 checkpoints without a decoder start id begin decoding from pad.
fn decoder_start_token(decoder_start_token_id: Option<usize>, pad_token_id: usize) -> u32 {
    decoder_start_token_id.unwrap_or(pad_token_id) as u32
}

fn next_token_log_probs(
    model: &mut T5ForConditionalGeneration,
    prefix: &[u32],
    encoder_output: &Tensor,
    device: &Device,
) -> candle::Result<Vec<f32>> {
    let decoder_input = Tensor::new(prefix, device)?.unsqueeze(0)?;
    let logits = model.decode(&decoder_input, encoder_output)?.squeeze(0)?;
    let log_probs = candle_nn::ops::log_softmax(&logits, D::Minus1)?;
    log_probs.to_dtype(DType::F32)?.to_vec1::<f32>()
}

fn tensor_err(e: candle::Error) -> Text2SqlError {
    Text2SqlError::inference(BACKEND, e.to_string())
}

fn load_err(e: candle::Error) -> Text2SqlError {
    Text2SqlError::config(format!("failed to load model: {}", e))
}
