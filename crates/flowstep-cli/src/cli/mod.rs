//! CLI command definitions for the `flowstep` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod simulate;
pub mod step;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Step and simulate Flowstep flows.
#[derive(Parser)]
#[command(name = "flowstep", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Engine configuration file (defaults to $FLOWSTEP_HOME/config.toml).
    #[arg(long, global = true, env = "FLOWSTEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the current action of a persisted invocation once.
    Step {
        /// Flow definition (YAML or JSON).
        #[arg(long)]
        flow: PathBuf,

        /// Persisted invocation state (JSON).
        #[arg(long)]
        state: PathBuf,

        /// Evaluation time (RFC 3339). Defaults to the current time.
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Run a flow from its entry action on a virtual clock.
    Simulate {
        /// Flow definition (YAML or JSON).
        #[arg(long)]
        flow: PathBuf,

        /// Triggering event (JSON).
        #[arg(long)]
        event: Option<PathBuf>,

        /// Virtual start time (RFC 3339). Defaults to the current time.
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Stop after this many steps.
        #[arg(long, default_value = "100")]
        max_steps: usize,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
