//! Command-line arguments and start-up prompts for the `lectern` binary.

pub mod chat;
pub mod setup;

use std::path::PathBuf;

use clap::Parser;

use lectern_types::config::OracleConfig;
use lectern_types::llm::ProviderType;

/// Ask questions about your documents.
#[derive(Parser, Debug)]
#[command(name = "lectern", version, about, long_about = None)]
pub struct Cli {
    /// Model to use. Prompted for when missing.
    #[arg(long, env = "LECTERN_MODEL")]
    pub model: Option<String>,

    /// Backend: ollama, openai or openai_compatible. Defaults to the config file.
    #[arg(long, env = "LECTERN_PROVIDER")]
    pub provider: Option<ProviderType>,

    /// Endpoint override, e.g. http://gpu-box:11434/v1.
    #[arg(long, env = "LECTERN_BASE_URL")]
    pub base_url: Option<String>,

    /// File or directory of .md/.txt documents. Prompted for when missing.
    #[arg(long, env = "LECTERN_DOCS")]
    pub docs: Option<PathBuf>,

    /// Suppress all log output except errors.
    #[arg(long)]
    pub quiet: bool,

    /// Detailed output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long)]
    pub otel: bool,
}

impl Cli {
    /// Apply the backend flags on top of the loaded configuration.
    pub fn apply_oracle_overrides(&self, oracle: &mut OracleConfig) {
        if let Some(provider) = self.provider {
            oracle.provider = provider;
        }
        if let Some(base_url) = &self.base_url {
            oracle.base_url = Some(base_url.clone());
        }
    }
}
