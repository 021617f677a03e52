//! Flowstep command-line entry point.
//!
//! Binary name: `flowstep`
//!
//! Parses CLI arguments, installs tracing, loads the engine configuration
//! and dispatches to the command handler.

mod cli;
mod config;
mod files;

use chrono::Utc;
use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use flowstep_observe::tracing_setup::{self, TracingOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "flowstep", &mut std::io::stdout());
        return Ok(());
    }

    let mut options = TracingOptions::from_verbosity(cli.verbose, cli.quiet);
    options.json = cli.json;
    options.otel = cli.otel;
    tracing_setup::init_tracing(&options)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let config_path = config::config_path(cli.config.as_deref());
    let engine_config = config::load_engine_config(&config_path).await;
    tracing::info!(
        config = %config_path.display(),
        max_poll_interval_secs = engine_config.max_poll_interval_secs,
        "engine configured"
    );

    let result = match cli.command {
        Commands::Step { flow, state, now } => {
            cli::step::run_step(
                &engine_config,
                &flow,
                &state,
                now.unwrap_or_else(Utc::now),
                cli.json,
            )
            .await
        }
        Commands::Simulate {
            flow,
            event,
            start,
            max_steps,
        } => {
            cli::simulate::run_simulate(
                &engine_config,
                &flow,
                event.as_deref(),
                start.unwrap_or_else(Utc::now),
                max_steps,
                cli.json,
            )
            .await
        }
        Commands::Completions { .. } => Ok(()),
    };

    tracing_setup::shutdown_tracing();
    result
}
