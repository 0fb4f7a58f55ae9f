//! Service configuration

use crate::cli::Cli;
use phishguard_classifiers::{ModelSource, ModelSpec, ScoringConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Model backing the classifier
    #[serde(default)]
    pub model: ModelSpec,

    /// Phishing score derivation
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl ServiceConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(cli);
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Apply CLI overrides
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.server.host = listen.clone();
        }

        if let Some(port) = cli.port {
            self.server.port = port;
        }

        if let Some(path) = &cli.model_dir {
            self.model.source = ModelSource::Local { path: path.clone() };
        }

        if let Some(repo) = &cli.model {
            let revision = match &self.model.source {
                ModelSource::HuggingFace { revision, .. } => revision.clone(),
                ModelSource::Local { .. } => "main".to_string(),
            };
            self.model.source = ModelSource::HuggingFace {
                repo: repo.clone(),
                revision,
            };
        }

        if let Some(rev) = &cli.revision {
            match &mut self.model.source {
                ModelSource::HuggingFace { revision, .. } => *revision = rev.clone(),
                ModelSource::Local { path } => tracing::warn!(
                    "Ignoring --revision {}: model is loaded from local directory {}",
                    rev,
                    path.display()
                ),
            }
        }

        if let Some(device) = &cli.device {
            self.model.inference.device = device.clone();
        }
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.host, self.server.port).parse()?)
    }
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}
