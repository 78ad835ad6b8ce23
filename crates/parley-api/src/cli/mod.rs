//! CLI definition for the `parley` binary.

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;

pub mod user;

/// Parley chat backend: server and admin tooling.
#[derive(Debug, Parser)]
#[command(name = "parley", version, about = "Real-time chat backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit machine-readable JSON output.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the REST API server and realtime gateway.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Export spans via OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,
    },

    /// Manage user accounts.
    User {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Manage bearer tokens.
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user account.
    Create {
        /// Unique username.
        username: String,
        /// Unique email address.
        email: String,
    },
    /// List all user accounts.
    List,
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Issue a bearer token for a user (printed once, stored hashed).
    Issue {
        /// Username to issue the token for.
        username: String,
    },
}
