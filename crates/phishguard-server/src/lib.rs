//! PhishGuard Server
//!
//! HTTP front end for the phishing URL classifier. The model is loaded once
//! at startup and shared read-only by every request through [`AppState`].

pub mod cli;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
