//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};

/// Watch live progress of backend runs from the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "runwatch",
    version,
    long_version = runwatch::build_info::CLI_LONG_VERSION,
    after_help = runwatch::build_info::HELP_BUILD_METADATA
)]
pub struct Args {
    /// Path to config file (default: ./runwatch.toml or ~/.config/runwatch/runwatch.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Override API base URL.
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Disable color output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow one run live until it finishes or Ctrl-C.
    Watch {
        run_id: String,
        /// Cycle to show first.
        #[arg(long = "cycle", default_value_t = 1)]
        cycle: usize,
    },
    /// Fetch the event list once and print it split into cycles.
    Events {
        run_id: String,
        /// Expected cycle count (default: the run's `cycles_total`).
        #[arg(long = "cycles")]
        cycles: Option<u32>,
    },
    /// Write the default config to ~/.config/runwatch/runwatch.toml.
    Init {
        /// Overwrite an existing file after backing it up.
        #[arg(long = "force")]
        force: bool,
    },
}
