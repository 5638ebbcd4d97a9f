//! CLI argument definitions.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agentcore", version, about = "Runtime core for an interactive coding agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single agent turn loop for a session.
    Run {
        /// Resume or create a named session for conversation persistence.
        #[arg(long, short)]
        session: Option<String>,

        /// Path to a runtime config TOML file. Defaults built in if omitted.
        #[arg(long)]
        config: Option<String>,
    },

    /// Show current runtime status.
    Status,

    /// Manage conversation sessions.
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// List all saved sessions for the current project.
    List,
    /// Show messages from a session.
    Show {
        /// The session id to display.
        id: String,
    },
}
