//! Commands module
//!
//! Defines all CLI commands and their handlers.
//!
//! Read and report commands log failures and print a neutral default
//! (`false`, `[]`, `{}` or `null`) so scripts keep going. Commands that change
//! state, and poller timeouts, exit non-zero.

mod cron;
mod helm;
mod session;
mod slx;
mod workspace;

pub use cron::CronCommands;
pub use helm::HelmCommands;
pub use session::SessionCommands;
pub use slx::SlxCommands;

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Cron schedule checks
    Cron {
        #[command(subcommand)]
        command: CronCommands,
    },
    /// Helm release image updates
    Helm {
        #[command(subcommand)]
        command: HelmCommands,
    },
    /// RunSession reports and actions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// SLX catalog lookups
    Slx {
        #[command(subcommand)]
        command: SlxCommands,
    },
    /// Search the workspace for tasks
    TaskSearch {
        /// Free-text query
        query: String,

        /// Persona to search as
        #[arg(long)]
        persona: Option<String>,

        /// Restrict the search to these SLXs (repeatable)
        #[arg(long)]
        scope: Vec<String>,
    },
    /// Read a memo value from the current RunRequest
    Memo {
        /// Memo key
        key: String,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Cron { command } => cron::handle_cron_command(command),
        Commands::Helm { command } => helm::handle_helm_command(command).await,
        Commands::Session { command } => session::handle_session_command(command, config).await,
        Commands::Slx { command } => slx::handle_slx_command(command, config).await,
        Commands::TaskSearch {
            query,
            persona,
            scope,
        } => workspace::task_search(config, &query, persona, scope).await,
        Commands::Memo { key } => workspace::memo(config, &key).await,
    }
}

/// Print a value as pretty JSON on stdout
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
