//! CLI command definitions for the `formbot` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod run;
pub mod state;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Multi-step chat forms over a webhook or a line-based transport.
#[derive(Parser)]
#[command(name = "formbot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: formbot.toml in the data directory).
    #[arg(long, global = true, env = "FORMBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook server.
    Serve {
        /// Port to listen on (overrides `[server] port`).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides `[server] host`).
        #[arg(long)]
        host: Option<String>,
    },

    /// Read JSON updates from stdin and write replies as JSON lines to stdout.
    Run,

    /// Inspect or clear stored wizard states.
    State {
        #[command(subcommand)]
        action: StateCommand,
    },
}

#[derive(Subcommand)]
pub enum StateCommand {
    /// Print the live form of a user.
    Show {
        /// User id.
        user_id: i64,
    },

    /// Discard the live form of a user.
    Clear {
        /// User id.
        user_id: i64,
    },

    /// Remove every expired state.
    Purge,
}
