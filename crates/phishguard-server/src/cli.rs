use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "phishguard")]
#[command(author, version, about = "Phishing URL classification service", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PHISHGUARD_CONFIG", default_value = "phishguard.yaml")]
    pub config: String,

    /// Listen address
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// HuggingFace model repository
    #[arg(short, long, conflicts_with = "model_dir")]
    pub model: Option<String>,

    /// Model revision on the HuggingFace Hub
    #[arg(long, conflicts_with = "model_dir")]
    pub revision: Option<String>,

    /// Local model directory (config.json, tokenizer.json, weights)
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Inference device (cpu, cuda, metal)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
