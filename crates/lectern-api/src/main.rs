//! Lectern CLI entry point.
//!
//! Binary name: `lectern`
//!
//! Resolves the model and documents (prompting for whichever is missing),
//! loads and indexes the documents, then runs the question loop.

mod cli;
mod state;

use clap::Parser;
use console::style;

use lectern_infra::config::{load_config, resolve_data_dir};
use lectern_infra::llm::test_provider_connection;
use lectern_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::Cli;
use cli::chat::loop_runner::run_repl;
use cli::chat::renderer::spinner;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        verbosity: cli.verbose,
        quiet: cli.quiet,
        otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = resolve_data_dir();
    let mut config = load_config(&data_dir).await;
    cli.apply_oracle_overrides(&mut config.oracle);

    let model = cli::setup::resolve_model(cli.model, &config.oracle.model)?;
    let docs = cli::setup::resolve_docs(cli.docs)?;

    let progress = spinner("loading documents...");
    let state = AppState::init(config, model, docs).await;
    progress.finish_and_clear();
    let state = state?;

    let progress = spinner("connecting to the model...");
    let connection = test_provider_connection(state.oracle.provider()).await;
    progress.finish_and_clear();
    if let Err(e) = connection {
        tracing::warn!(error = %e, model = state.model(), "provider connection check failed");
        eprintln!(
            "  {} Could not reach the model ({e}). Requests will fail until it is available.",
            style("!").yellow().bold()
        );
    }

    run_repl(&state).await
}
