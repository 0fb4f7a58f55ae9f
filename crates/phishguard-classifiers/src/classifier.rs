//! Classifier trait

use async_trait::async_trait;
use phishguard_core::{LabelScore, Result};

/// Trait for text classifiers.
///
/// Implementations are loaded once and shared read-only across requests, so
/// `classify` takes `&self` and must be safe to call concurrently.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Classify the given text, returning label/score pairs ordered by
    /// descending score. The list has at least one entry on success.
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>>;

    /// Get the classifier name
    fn name(&self) -> &str;
}
