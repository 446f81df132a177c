//! Command-line interface for tiktaktoes.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tiktaktoes - real-time two-player game server
#[derive(Parser, Debug)]
#[command(name = "tiktaktoes")]
#[command(about = "Real-time tic-tac-toe server with WebSocket and SSE updates", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
