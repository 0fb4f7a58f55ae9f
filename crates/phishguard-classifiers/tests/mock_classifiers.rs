//! Mock classifiers for testing
//!
//! Configurable implementations of the TextClassifier trait for exercising
//! shared use, failure propagation and score derivation.

use async_trait::async_trait;
use phishguard_classifiers::{PhishingScorer, ScoringConfig, TextClassifier};
use phishguard_core::{Error, LabelScore, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A configurable mock classifier for testing
pub struct MockClassifier {
    name: String,
    output: Vec<LabelScore>,
    fail: bool,
    simulated_latency: Option<Duration>,
    call_count: AtomicU32,
}

impl MockClassifier {
    /// Create a new mock classifier returning a single benign label
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            output: vec![LabelScore::new("benign", 0.9)],
            fail: false,
            simulated_latency: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the output this classifier will return
    pub fn with_output(mut self, output: Vec<LabelScore>) -> Self {
        self.output = output;
        self
    }

    /// Make every call fail
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Set simulated latency for this classifier
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    /// Get the number of times classify was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextClassifier for MockClassifier {
    async fn classify(&self, _text: &str) -> Result<Vec<LabelScore>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail {
            return Err(Error::classifier("mock failure"));
        }
        Ok(self.output.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[tokio::test]
async fn test_mock_returns_configured_output() {
    let classifier = MockClassifier::new("mock")
        .with_output(vec![LabelScore::new("phishing", 0.8), LabelScore::new("benign", 0.2)]);

    let result = classifier.classify("http://example.com").await.unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].label, "phishing");
    assert_eq!(classifier.call_count(), 1);
}

#[tokio::test]
async fn test_failing_classifier_returns_error() {
    let classifier = MockClassifier::new("broken").failing();

    let err = classifier.classify("http://example.com").await.unwrap_err();
    assert!(matches!(err, Error::Classifier(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shared_classifier_concurrent_calls() {
    let classifier: Arc<dyn TextClassifier> = Arc::new(
        MockClassifier::new("shared").with_latency(Duration::from_millis(20)),
    );

    let a = {
        let c = Arc::clone(&classifier);
        tokio::spawn(async move { c.classify("http://example.com").await })
    };
    let b = {
        let c = Arc::clone(&classifier);
        tokio::spawn(async move { c.classify("http://example.com").await })
    };

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_scorer_over_mock_output() {
    let classifier = MockClassifier::new("mock").with_output(vec![LabelScore::new("benign", 0.75)]);
    let scorer = PhishingScorer::new(ScoringConfig::default()).unwrap();

    let url = scorer.normalize_target("suspicious-login.io").unwrap();
    let result = classifier.classify(&url).await.unwrap();

    assert_eq!(url, "https://www.suspicious-login.io/");
    assert_eq!(scorer.phishing_score(&url, &result), 0.25);
}
