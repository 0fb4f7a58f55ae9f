//! Candle-backed BERT sequence classifier
//!
//! Loads a fine-tuned `BertForSequenceClassification` checkpoint (encoder,
//! pooler, classification head) and runs it on the blocking thread pool.

use crate::classifier::TextClassifier;
use crate::model_config::{ModelSource, ModelSpec};
use crate::postprocess::{self, Activation, LabelMap};
use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::{api::sync::Api, Repo, RepoType};
use phishguard_core::{Error, LabelScore, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokenizers::{Tokenizer, TruncationParams};

/// BERT sequence classifier shared across requests
pub struct BertSequenceClassifier {
    name: String,
    inner: Arc<BertInner>,
}

struct BertInner {
    tokenizer: Tokenizer,
    model: BertModel,
    pooler: Option<Linear>,
    head: Linear,
    device: Device,
    labels: LabelMap,
    activation: Activation,
    top_k: Option<usize>,
}

impl BertSequenceClassifier {
    /// Load the model described by `spec`. Blocks on downloads and weight
    /// loading.
    pub fn load(spec: &ModelSpec) -> Result<Self> {
        let start = Instant::now();
        tracing::info!("Loading model '{}' from {}", spec.name, spec.source);

        let files = ModelFiles::resolve(&spec.source)?;
        let config_str = std::fs::read_to_string(&files.config).map_err(|e| {
            Error::classifier(format!(
                "Failed to read config {}: {}",
                files.config.display(),
                e
            ))
        })?;
        let config_json: serde_json::Value = serde_json::from_str(&config_str)?;
        let bert_config: BertConfig = serde_json::from_str(&config_str)?;
        let labels = LabelMap::from_config_json(&config_json)?;

        let mut tokenizer = files.tokenizer.load()?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: spec.inference.max_length,
                ..Default::default()
            }))
            .map_err(|e| Error::classifier(format!("Failed to configure truncation: {}", e)))?;
        tokenizer.with_padding(None);

        let device = get_device(&spec.inference.device)?;
        let vb = files.weights.var_builder(&device)?;

        let (model, backbone_vb) = load_backbone(&vb, &bert_config)?;
        let hidden_size = bert_config.hidden_size;
        let pooler =
            candle_nn::linear(hidden_size, hidden_size, backbone_vb.pp("pooler").pp("dense")).ok();
        if pooler.is_none() {
            tracing::warn!("No pooler weights found, classifying from the [CLS] hidden state");
        }

        let head = candle_nn::linear(hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| {
                Error::classifier(format!(
                    "Failed to load classification head ({} labels): {}",
                    labels.len(),
                    e
                ))
            })?;

        tracing::info!(
            "Loaded '{}' with {} labels on {:?} in {}ms",
            spec.name,
            labels.len(),
            device,
            start.elapsed().as_millis()
        );

        Ok(Self {
            name: spec.name.clone(),
            inner: Arc::new(BertInner {
                tokenizer,
                model,
                pooler,
                head,
                device,
                activation: Activation::for_num_labels(labels.len()),
                labels,
                top_k: spec.inference.top_k,
            }),
        })
    }

    /// Labels the classification head predicts, by class index
    pub fn labels(&self) -> &LabelMap {
        &self.inner.labels
    }
}

#[async_trait]
impl TextClassifier for BertSequenceClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_owned();

        tokio::task::spawn_blocking(move || inner.infer(&text))
            .await
            .map_err(|e| Error::internal(format!("Inference task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl BertInner {
    fn infer(&self, text: &str) -> Result<Vec<LabelScore>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::classifier(format!("Tokenization failed: {}", e)))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(candle_err("Failed to create input tensor"))?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(candle_err("Failed to create token type tensor"))?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, None)
            .map_err(candle_err("Model forward pass failed"))?;

        let cls = hidden_states
            .i((.., 0))
            .map_err(candle_err("Failed to get CLS token"))?;

        let pooled = match &self.pooler {
            Some(pooler) => pooler
                .forward(&cls)
                .and_then(|t| t.tanh())
                .map_err(candle_err("Pooler failed"))?,
            None => cls,
        };

        let logits = self
            .head
            .forward(&pooled)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(candle_err("Classification head failed"))?;

        let probs = self.activation.apply(&logits);
        Ok(postprocess::rank(&probs, &self.labels, self.top_k))
    }
}

fn candle_err(context: &'static str) -> impl Fn(candle_core::Error) -> Error {
    move |e| Error::classifier(format!("{}: {}", context, e))
}

/// Model files on local disk, downloaded first when the source is the Hub
#[derive(Debug)]
struct ModelFiles {
    config: PathBuf,
    tokenizer: TokenizerFile,
    weights: WeightsFile,
}

#[derive(Debug)]
enum TokenizerFile {
    Json(PathBuf),
    Vocab(PathBuf),
}

#[derive(Debug)]
enum WeightsFile {
    SafeTensors(PathBuf),
    PyTorch(PathBuf),
}

impl ModelFiles {
    fn resolve(source: &ModelSource) -> Result<Self> {
        match source {
            ModelSource::Local { path } => Self::from_dir(path),
            ModelSource::HuggingFace { repo, revision } => Self::download(repo, revision),
        }
    }

    fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::config(format!(
                "Model directory does not exist: {}",
                dir.display()
            )));
        }

        let config = dir.join("config.json");
        if !config.exists() {
            return Err(Error::config(format!(
                "config.json not found in {}",
                dir.display()
            )));
        }

        let tokenizer = match (dir.join("tokenizer.json"), dir.join("vocab.txt")) {
            (json, _) if json.exists() => TokenizerFile::Json(json),
            (_, vocab) if vocab.exists() => TokenizerFile::Vocab(vocab),
            _ => {
                return Err(Error::config(format!(
                    "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
                    dir.display()
                )))
            }
        };

        let weights = match (dir.join("model.safetensors"), dir.join("pytorch_model.bin")) {
            (st, _) if st.exists() => WeightsFile::SafeTensors(st),
            (_, pt) if pt.exists() => WeightsFile::PyTorch(pt),
            _ => {
                return Err(Error::config(format!(
                    "No model weights found in {} (tried model.safetensors, pytorch_model.bin)",
                    dir.display()
                )))
            }
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }

    fn download(repo: &str, revision: &str) -> Result<Self> {
        tracing::info!("Fetching model from HuggingFace: {} @ {}", repo, revision);

        let api = Api::new()
            .map_err(|e| Error::config(format!("Failed to initialize HuggingFace API: {}", e)))?;
        let repo_obj = api.repo(Repo::with_revision(
            repo.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));

        let config = repo_obj
            .get("config.json")
            .map_err(|e| Error::config(format!("Failed to download config.json: {}", e)))?;

        let tokenizer = match repo_obj.get("tokenizer.json") {
            Ok(path) => TokenizerFile::Json(path),
            Err(e) => {
                tracing::debug!("tokenizer.json unavailable ({}), trying vocab.txt", e);
                repo_obj.get("vocab.txt").map(TokenizerFile::Vocab).map_err(|e| {
                    Error::config(format!(
                        "No tokenizer found (tried tokenizer.json, vocab.txt): {}",
                        e
                    ))
                })?
            }
        };

        let weights = match repo_obj.get("model.safetensors") {
            Ok(path) => WeightsFile::SafeTensors(path),
            Err(e) => {
                tracing::debug!("model.safetensors unavailable ({}), trying pytorch_model.bin", e);
                repo_obj
                    .get("pytorch_model.bin")
                    .map(WeightsFile::PyTorch)
                    .map_err(|e| {
                        Error::config(format!(
                            "No model weights found (tried model.safetensors, pytorch_model.bin): {}",
                            e
                        ))
                    })?
            }
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }
}

impl TokenizerFile {
    fn load(&self) -> Result<Tokenizer> {
        match self {
            Self::Json(path) => Tokenizer::from_file(path)
                .map_err(|e| Error::classifier(format!("Failed to load tokenizer.json: {}", e))),
            Self::Vocab(path) => {
                use tokenizers::models::wordpiece::WordPiece;
                use tokenizers::normalizers::BertNormalizer;
                use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
                use tokenizers::processors::bert::BertProcessing;

                tracing::debug!("Building tokenizer from {}", path.display());

                let wordpiece = WordPiece::from_file(path.to_string_lossy().as_ref())
                    .unk_token("[UNK]".to_string())
                    .build()
                    .map_err(|e| {
                        Error::classifier(format!("Failed to build WordPiece model: {}", e))
                    })?;

                let mut tokenizer = Tokenizer::new(wordpiece);
                tokenizer.with_normalizer(Some(BertNormalizer::default()));
                tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

                let sep_id = tokenizer.token_to_id("[SEP]").unwrap_or(102);
                let cls_id = tokenizer.token_to_id("[CLS]").unwrap_or(101);
                tokenizer.with_post_processor(Some(BertProcessing::new(
                    ("[SEP]".to_string(), sep_id),
                    ("[CLS]".to_string(), cls_id),
                )));

                Ok(tokenizer)
            }
        }
    }
}

impl WeightsFile {
    fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        match self {
            Self::SafeTensors(path) => {
                // SAFETY: the file is not modified while the mapping is alive.
                unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device) }
                    .map_err(candle_err("Failed to load SafeTensors weights"))
            }
            Self::PyTorch(path) => VarBuilder::from_pth(path, DType::F32, device)
                .map_err(candle_err("Failed to load PyTorch weights")),
        }
    }
}

/// Load the encoder, returning it with the builder rooted at its prefix
fn load_backbone(
    vb: &VarBuilder<'static>,
    config: &BertConfig,
) -> Result<(BertModel, VarBuilder<'static>)> {
    let mut errors = Vec::new();

    for prefix in ["bert", ""] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };
        let effective_prefix = if prefix.is_empty() { "<root>" } else { prefix };

        match BertModel::load(vb_prefix.clone(), config) {
            Ok(model) => {
                tracing::debug!("Loaded BERT backbone from '{}'", effective_prefix);
                return Ok((model, vb_prefix));
            }
            Err(e) => errors.push(format!("{}: {}", effective_prefix, e)),
        }
    }

    Err(Error::classifier(format!(
        "Failed to load BERT backbone with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cpu" => Ok(Device::Cpu),
        "cuda" | "cuda:0" => Device::new_cuda(0)
            .map_err(|e| Error::config(format!("Failed to initialize CUDA: {}", e))),
        "mps" | "metal" => Device::new_metal(0)
            .map_err(|e| Error::config(format!("Failed to initialize Metal: {}", e))),
        other => Err(Error::config(format!("Unknown device '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;
    use std::fs;

    const HIDDEN: usize = 8;

    /// Write a randomly initialized one-layer BERT classifier to `dir`
    fn write_tiny_model(dir: &Path, labels: &[&str]) {
        let vocab = [
            "[PAD]", "[UNK]", "[CLS]", "[SEP]", "http", "https", ":", "/", ".", "www",
            "example", "com", "login", "secure",
        ];
        fs::write(dir.join("vocab.txt"), vocab.join("\n")).unwrap();

        let id2label: serde_json::Map<String, serde_json::Value> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (i.to_string(), serde_json::Value::from(*l)))
            .collect();
        let config = serde_json::json!({
            "model_type": "bert",
            "vocab_size": vocab.len(),
            "hidden_size": HIDDEN,
            "num_hidden_layers": 1,
            "num_attention_heads": 2,
            "intermediate_size": 16,
            "hidden_act": "gelu",
            "hidden_dropout_prob": 0.0,
            "max_position_embeddings": 32,
            "type_vocab_size": 2,
            "initializer_range": 0.02,
            "layer_norm_eps": 1e-12,
            "pad_token_id": 0,
            "num_labels": labels.len(),
            "id2label": id2label,
        });
        fs::write(dir.join("config.json"), config.to_string()).unwrap();

        let bert_config: BertConfig = serde_json::from_value(config).unwrap();
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        BertModel::load(vb.pp("bert"), &bert_config).unwrap();
        candle_nn::linear(HIDDEN, HIDDEN, vb.pp("bert").pp("pooler").pp("dense")).unwrap();
        candle_nn::linear(HIDDEN, labels.len(), vb.pp("classifier")).unwrap();
        varmap.save(dir.join("model.safetensors")).unwrap();
    }

    fn tiny_spec(dir: &Path, top_k: Option<usize>) -> ModelSpec {
        let mut spec = ModelSpec {
            name: "tiny".to_string(),
            source: ModelSource::Local {
                path: dir.to_path_buf(),
            },
            ..Default::default()
        };
        spec.inference.max_length = 16;
        spec.inference.top_k = top_k;
        spec
    }

    #[tokio::test]
    async fn test_tiny_model_returns_distribution() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_model(dir.path(), &["benign", "phishing"]);

        let classifier = BertSequenceClassifier::load(&tiny_spec(dir.path(), None)).unwrap();
        assert_eq!(classifier.labels().len(), 2);
        assert_eq!(classifier.name(), "tiny");

        let result = classifier.classify("https://www.example.com/login").await.unwrap();
        assert_eq!(result.len(), 2);
        assert!(result[0].score >= result[1].score);
        let mut labels: Vec<&str> = result.iter().map(|r| r.label.as_str()).collect();
        labels.sort();
        assert_eq!(labels, vec!["benign", "phishing"]);

        let sum: f32 = result.iter().map(|r| r.score).sum();
        assert!((sum - 1.0).abs() < 1e-4);

        let again = classifier.classify("https://www.example.com/login").await.unwrap();
        assert_eq!(result, again);
    }

    #[tokio::test]
    async fn test_tiny_model_truncates_long_input() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_model(dir.path(), &["benign", "phishing"]);

        let classifier = BertSequenceClassifier::load(&tiny_spec(dir.path(), Some(1))).unwrap();
        let long = "secure login example com ".repeat(50);

        let result = classifier.classify(&long).await.unwrap();
        assert_eq!(result.len(), 1);
        assert!((0.0..=1.0).contains(&result[0].score));
    }

    #[tokio::test]
    async fn test_tiny_single_label_head_uses_sigmoid() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_model(dir.path(), &["phishing"]);

        let classifier = BertSequenceClassifier::load(&tiny_spec(dir.path(), None)).unwrap();
        let result = classifier.classify("http://example.com").await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].label, "phishing");
        assert!(result[0].score > 0.0 && result[0].score < 1.0);
    }

    #[test]
    fn test_head_size_mismatch_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        write_tiny_model(dir.path(), &["benign", "phishing"]);

        let config_path = dir.path().join("config.json");
        let mut config: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
        config["num_labels"] = 3.into();
        config["id2label"]["2"] = "spam".into();
        fs::write(&config_path, config.to_string()).unwrap();

        let err = BertSequenceClassifier::load(&tiny_spec(dir.path(), None))
            .err()
            .unwrap();
        assert!(err.to_string().contains("classification head"));
    }

    #[test]
    fn test_cpu_device() {
        assert!(matches!(get_device("CPU").unwrap(), Device::Cpu));
        assert!(get_device("tpu").is_err());
    }

    #[test]
    fn test_missing_model_dir() {
        let err = ModelFiles::from_dir(Path::new("./does/not/exist")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_dir_without_weights() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{}").unwrap();
        fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();

        let err = ModelFiles::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No model weights"));
    }

    #[test]
    fn test_dir_prefers_safetensors_and_tokenizer_json() {
        let dir = tempfile::tempdir().unwrap();
        for file in [
            "config.json",
            "tokenizer.json",
            "vocab.txt",
            "model.safetensors",
            "pytorch_model.bin",
        ] {
            fs::write(dir.path().join(file), "").unwrap();
        }

        let files = ModelFiles::from_dir(dir.path()).unwrap();
        assert!(matches!(files.tokenizer, TokenizerFile::Json(_)));
        assert!(matches!(files.weights, WeightsFile::SafeTensors(_)));
    }

    #[test]
    fn test_dir_falls_back_to_vocab_and_pth() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["config.json", "vocab.txt", "pytorch_model.bin"] {
            fs::write(dir.path().join(file), "").unwrap();
        }

        let files = ModelFiles::from_dir(dir.path()).unwrap();
        assert!(matches!(files.tokenizer, TokenizerFile::Vocab(_)));
        assert!(matches!(files.weights, WeightsFile::PyTorch(_)));
    }

    #[test]
    fn test_load_fails_for_missing_local_model() {
        let spec = ModelSpec {
            source: ModelSource::Local {
                path: PathBuf::from("./models/missing"),
            },
            ..Default::default()
        };
        assert!(BertSequenceClassifier::load(&spec).is_err());
    }
}
