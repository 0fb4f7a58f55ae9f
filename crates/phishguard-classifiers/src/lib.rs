//! PhishGuard Classifiers
//!
//! Text classification for the PhishGuard service.
//!
//! - [`TextClassifier`] is the seam between the HTTP layer and inference.
//! - [`BertSequenceClassifier`] runs a fine-tuned BERT sequence classifier
//!   with Candle, fetched from the Hugging Face Hub or a local directory.
//! - [`PhishingScorer`] reduces a label/score list to one phishing probability.

pub mod bert;
pub mod classifier;
pub mod model_config;
pub mod postprocess;
pub mod scoring;

pub use bert::BertSequenceClassifier;
pub use classifier::TextClassifier;
pub use model_config::{InferenceConfig, ModelSource, ModelSpec};
pub use postprocess::{Activation, LabelMap};
pub use scoring::{PhishingScorer, ScoringConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bert::BertSequenceClassifier;
    pub use crate::classifier::TextClassifier;
    pub use crate::model_config::{ModelSource, ModelSpec};
    pub use crate::scoring::PhishingScorer;
    pub use phishguard_core::LabelScore;
}
