//! Wire types shared between the classifiers and the HTTP service

use serde::{Deserialize, Serialize};

/// A single classifier output unit: a category name and its confidence.
///
/// Serialized as `{"label": "...", "score": 0.97}`. A classifier returns one
/// or more of these; callers must not assume a fixed count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// Category name, e.g. `phishing` or `benign`
    pub label: String,

    /// Confidence in [0, 1]
    pub score: f32,
}

impl LabelScore {
    /// Create a new label/score pair
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}
