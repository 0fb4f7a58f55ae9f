//! Turning classification-head logits into label/score pairs

use phishguard_core::{Error, LabelScore, Result};
use std::cmp::Ordering;

/// Upper bound on the classes a head may declare
pub const MAX_LABELS: usize = 4096;

/// Activation applied to raw logits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Single-label classification over two or more labels
    Softmax,
    /// A single output unit (regression-style probability)
    Sigmoid,
}

impl Activation {
    /// Pick the activation a text-classification pipeline uses for a head
    /// with `num_labels` outputs.
    pub fn for_num_labels(num_labels: usize) -> Self {
        if num_labels == 1 {
            Self::Sigmoid
        } else {
            Self::Softmax
        }
    }

    /// Apply the activation to a logit vector
    pub fn apply(self, logits: &[f32]) -> Vec<f32> {
        match self {
            Self::Sigmoid => logits.iter().map(|&x| 1.0 / (1.0 + (-x).exp())).collect(),
            Self::Softmax => {
                let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
                let sum: f32 = exps.iter().sum();
                exps.into_iter().map(|e| e / sum).collect()
            }
        }
    }
}

/// Index-to-label mapping read from a model's `config.json`
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    /// Build from explicit labels, ordered by class index
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Read `id2label` (and `num_labels` when present) from a parsed
    /// HuggingFace `config.json`. Gaps are filled with `LABEL_<i>`.
    pub fn from_config_json(config: &serde_json::Value) -> Result<Self> {
        let mut entries: Vec<(usize, String)> = Vec::new();

        if let Some(map) = config.get("id2label").and_then(|v| v.as_object()) {
            for (key, value) in map {
                let idx: usize = key.parse().map_err(|_| {
                    Error::config(format!("id2label key '{}' is not a class index", key))
                })?;
                let label = value.as_str().ok_or_else(|| {
                    Error::config(format!("id2label value for '{}' is not a string", key))
                })?;
                entries.push((idx, label.to_string()));
            }
        }

        let declared = config
            .get("num_labels")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize);
        if let Some(n) = declared {
            if let Some((idx, _)) = entries.iter().find(|(idx, _)| *idx >= n) {
                return Err(Error::config(format!(
                    "id2label index {} is out of range for num_labels {}",
                    idx, n
                )));
            }
        }

        let highest = entries.iter().map(|(idx, _)| idx + 1).max().unwrap_or(0);
        let num_labels = declared.unwrap_or(0).max(highest);
        let num_labels = if num_labels == 0 { 2 } else { num_labels };
        if num_labels > MAX_LABELS {
            return Err(Error::config(format!(
                "{} labels exceeds the supported maximum of {}",
                num_labels, MAX_LABELS
            )));
        }

        let mut labels: Vec<String> = (0..num_labels).map(|i| format!("LABEL_{}", i)).collect();
        for (idx, label) in entries {
            labels[idx] = label;
        }

        Ok(Self { labels })
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the map has no classes
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a class index
    pub fn label(&self, idx: usize) -> String {
        self.labels
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{}", idx))
    }
}

/// Pair probabilities with labels, sort by descending score and keep `top_k`.
pub fn rank(probs: &[f32], labels: &LabelMap, top_k: Option<usize>) -> Vec<LabelScore> {
    let mut ranked: Vec<LabelScore> = probs
        .iter()
        .enumerate()
        .map(|(idx, &score)| LabelScore::new(labels.label(idx), score))
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    if let Some(k) = top_k {
        ranked.truncate(k.max(1));
    }
    ranked
}
