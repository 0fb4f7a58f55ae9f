//! PhishGuard Core
//!
//! Types shared across PhishGuard components:
//! - Error type and result alias
//! - The label/score pair emitted by text classifiers

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::LabelScore;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::LabelScore;
}
