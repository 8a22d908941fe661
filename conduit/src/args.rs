use std::path::PathBuf;

use clap::Parser;

/// Conduit LLM client
#[derive(Debug, Parser)]
#[command(name = "conduit", about = "Send a prompt to an OpenAI- or Anthropic-protocol model")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "conduit.toml", env = "CONDUIT_CONFIG")]
    pub config: PathBuf,

    /// Provider entry to use; defaults to the first one configured
    #[arg(short, long, env = "CONDUIT_PROVIDER")]
    pub provider: Option<String>,

    /// Print text as it arrives
    #[arg(short, long)]
    pub stream: bool,

    /// System instruction sent ahead of the prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Prompt text
    #[arg(required = true)]
    pub prompt: Vec<String>,
}
