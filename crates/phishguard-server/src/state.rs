use metrics_exporter_prometheus::PrometheusHandle;
use phishguard_classifiers::{PhishingScorer, TextClassifier};
use std::sync::Arc;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Classifier loaded at startup, read-only afterwards
    pub classifier: Arc<dyn TextClassifier>,

    /// Phishing score derivation for `/phishing/score`
    pub scorer: Arc<PhishingScorer>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        classifier: Arc<dyn TextClassifier>,
        scorer: PhishingScorer,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            classifier,
            scorer: Arc::new(scorer),
            metrics_handle,
        }
    }
}
