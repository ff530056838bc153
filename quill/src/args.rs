use std::path::PathBuf;

use clap::Parser;

/// Quill structured generation
#[derive(Debug, Parser)]
#[command(name = "quill", about = "Ask an LLM for JSON and get back a repaired, decoded object")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "quill.toml", env = "QUILL_CONFIG")]
    pub config: PathBuf,

    /// Print text as it arrives instead of waiting for the full response
    #[arg(long)]
    pub stream: bool,

    /// System prompt sent ahead of the user prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Override the configured model
    #[arg(long, env = "QUILL_MODEL")]
    pub model: Option<String>,

    /// Override the configured log filter
    #[arg(long, env = "QUILL_LOG")]
    pub log: Option<String>,

    /// User prompt
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,
}
