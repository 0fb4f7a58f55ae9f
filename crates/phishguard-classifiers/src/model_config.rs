//! Model configuration structures

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default model fine-tuned for phishing URL detection
pub const DEFAULT_MODEL_REPO: &str = "ealvaradob/bert-finetuned-phishing";

/// Configuration for the model backing the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name, used in logs and as the classifier name
    #[serde(default = "default_name")]
    pub name: String,

    /// Where to load the model from
    #[serde(default)]
    pub source: ModelSource,

    /// Inference settings
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name: default_name(),
            source: ModelSource::default(),
            inference: InferenceConfig::default(),
        }
    }
}

fn default_name() -> String {
    "phishing".to_string()
}

/// Model source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Directory holding `config.json`, `tokenizer.json` and the weights
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::HuggingFace {
            repo: DEFAULT_MODEL_REPO.to_string(),
            revision: default_revision(),
        }
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { path } => write!(f, "local:{}", path.display()),
            Self::HuggingFace { repo, revision } => write!(f, "hf:{}@{}", repo, revision),
        }
    }
}

fn default_revision() -> String {
    "main".to_string()
}

/// Inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Device to run on (cpu, cuda, metal/mps)
    #[serde(default = "default_device")]
    pub device: String,

    /// Maximum sequence length; longer inputs are truncated
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Number of labels to return, highest score first. `None` returns all.
    #[serde(default = "default_top_k")]
    pub top_k: Option<usize>,
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    512
}

fn default_top_k() -> Option<usize> {
    Some(1)
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            max_length: default_max_length(),
            top_k: default_top_k(),
        }
    }
}
