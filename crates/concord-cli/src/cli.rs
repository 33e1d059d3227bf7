//! Command-line surface for the `concord` binary.
//!
//! With no subcommand the process runs the tool-RPC server (stdio
//! line-framed JSON by default, HTTP when `--http` is given).
//! `dashboard`/`dash`/`observe` run an interactive monitor over the
//! observation bus, `demo` generates simulated activity, `stats` prints
//! bus statistics once and exits, `analytics` prints aggregate
//! negotiation/emergence metrics over a trailing window.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(name = "concord", version, about = "Multi-agent coordination engine: alignment, negotiation, protocol emergence, and workflow orchestration.")]
pub struct Cli {
    /// Serve the tool-RPC surface over HTTP instead of line-framed stdio.
    #[arg(long, global = true)]
    pub http: bool,

    /// HTTP port, only meaningful with --http.
    #[arg(long, default_value_t = 8000, global = true)]
    pub port: u16,

    /// Path to a YAML config file overriding alignment/negotiation/observation
    /// defaults. Falls back to all engine defaults if omitted.
    #[arg(long, env = "CONCORD_CONFIG", global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an interactive terminal monitor over the observation bus.
    #[command(alias = "dash", alias = "observe")]
    Dashboard {
        /// Dashboard backend: "terminal" (refreshing) or "snapshot" (single render).
        #[arg(short = 'm', long = "mode", default_value = "terminal")]
        mode: String,

        /// Refresh cadence in seconds, for terminal mode.
        #[arg(short = 'r', long = "refresh", default_value_t = 2)]
        refresh: u64,
    },

    /// Run a simulated-activity generator against the coordination engines.
    Demo {
        /// Number of simulated collaboration rounds to run.
        #[arg(long, default_value_t = 20)]
        rounds: u64,
    },

    /// Print observation bus statistics once and exit.
    Stats,

    /// Print aggregate negotiation/emergence metrics over a trailing window.
    Analytics {
        /// Trailing window, in minutes, over which to aggregate.
        #[arg(long = "window", default_value_t = 60)]
        window_minutes: i64,
    },

    /// Print a shell completion script to stdout.
    Completion {
        shell: Shell,
    },
}
