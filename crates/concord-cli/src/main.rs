//! `concord`: the CLI and tool-RPC server for the multi-agent
//! coordination engine. With no subcommand it runs the server; see
//! [`cli::Command`] for the rest of the surface.

mod cli;
mod commands;
mod config;
mod dispatch;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::ServerConfig;
use state::AppState;

#[tokio::main]
async fn main() {
    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env().add_directive("concord=info".parse().unwrap())).init();

    let cli = Cli::parse();
    let server_config = match ServerConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load concord config");
            return 1;
        }
    };
    let state = AppState::with_config(server_config.orchestrator_config(), server_config.observation_config(), server_config.persistence_config());

    let result = match cli.command {
        None => commands::serve::run(state, cli.http, cli.port).await,
        Some(Command::Dashboard { mode, refresh }) => {
            let r = commands::dashboard::run(&state, &mode, refresh).await;
            state.shutdown().await;
            r
        }
        Some(Command::Demo { rounds }) => {
            let r = commands::demo::run(&state, rounds).await;
            state.shutdown().await;
            r
        }
        Some(Command::Stats) => {
            let r = commands::stats::run(&state);
            state.shutdown().await;
            r
        }
        Some(Command::Analytics { window_minutes }) => {
            let r = commands::analytics::run(&state, window_minutes);
            state.shutdown().await;
            r
        }
        Some(Command::Completion { shell }) => {
            state.shutdown().await;
            commands::completion::run(shell)
        }
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "concord exited with an unrecoverable error");
            1
        }
    }
}
