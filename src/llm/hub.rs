//! Model file resolution: local directory or Hugging Face hub cache.

use crate::config::LocalModelConfig;
use crate::types::{Result, Text2SqlError};
use hf_hub::api::sync::{Api, ApiRepo};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const SAFETENSORS_FILE: &str = "model.safetensors";
const PYTORCH_FILE: &str = "pytorch_model.bin";

/// Model weights on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Weights {
    Safetensors(PathBuf),
    Pytorch(PathBuf),
}

/// Files needed to load a seq2seq model.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: Weights,
}

impl Weights {
    /// Path of the weights file.
    pub fn path(&self) -> &Path {
        match self {
            Self::Safetensors(p) | Self::Pytorch(p) => p,
        }
    }
}

impl ModelFiles {
    /// Resolve files from configuration (`model_dir` first, then `model_id`).
    ///
    /// # Errors
    ///
    /// Returns `Text2SqlError::ConfigError` if files are missing or the hub
    /// download fails
    pub fn resolve(config: &LocalModelConfig) -> Result<Self> {
        match (&config.model_dir, &config.model_id) {
            (Some(dir), _) => Self::from_dir(dir),
            (None, Some(id)) => Self::from_hub(id),
            (None, None) => Err(Text2SqlError::config(
                "local backend requires local.model_dir or local.model_id",
            )),
        }
    }

    /// Resolve files inside a model directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let required = |name: &str| {
            let path = dir.join(name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(Text2SqlError::config(format!(
                    "model directory {} is missing {}",
                    dir.display(),
                    name
                )))
            }
        };

        let config = required(CONFIG_FILE)?;
        let tokenizer = required(TOKENIZER_FILE)?;
        let weights = if dir.join(SAFETENSORS_FILE).is_file() {
            Weights::Safetensors(dir.join(SAFETENSORS_FILE))
        } else if dir.join(PYTORCH_FILE).is_file() {
            Weights::Pytorch(dir.join(PYTORCH_FILE))
        } else {
            return Err(Text2SqlError::config(format!(
                "model directory {} has neither {} nor {}",
                dir.display(),
                SAFETENSORS_FILE,
                PYTORCH_FILE
            )));
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }

    /// Fetch files through the hub cache.
    pub fn from_hub(model_id: &str) -> Result<Self> {
        let api = Api::new().map_err(hub_err)?;
        let repo = api.model(model_id.to_string());
        info!(model_id, "resolving model files from hub");

        let config = fetch(&repo, CONFIG_FILE)?;
        let tokenizer = fetch(&repo, TOKENIZER_FILE)?;
        let weights = match repo.get(SAFETENSORS_FILE) {
            Ok(path) => Weights::Safetensors(path),
            Err(_) => Weights::Pytorch(fetch(&repo, PYTORCH_FILE)?),
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }
}

/// Download a model from the hub into `output`.
///
/// # Returns
///
/// Paths of the files written
pub fn download(model_id: &str, output: &Path) -> Result<Vec<PathBuf>> {
    let files = ModelFiles::from_hub(model_id)?;
    fs::create_dir_all(output)?;

    let mut written = Vec::new();
    for src in [files.config.as_path(), files.tokenizer.as_path(), files.weights.path()] {
        let name = src
            .file_name()
            .ok_or_else(|| Text2SqlError::config(format!("bad cache path {}", src.display())))?;
        let dst = output.join(name);
        fs::copy(src, &dst)?;
        info!(file = %dst.display(), "saved");
        written.push(dst);
    }
    Ok(written)
}

fn fetch(repo: &ApiRepo, name: &str) -> Result<PathBuf> {
    repo.get(name)
        .map_err(|e| Text2SqlError::config(format!("failed to fetch {}: {}", name, e)))
}

fn hub_err(e: hf_hub::api::sync::ApiError) -> Text2SqlError {
    Text2SqlError::config(format!("hub error: {}", e))
}
