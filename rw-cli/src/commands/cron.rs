//! Cron command handlers

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::*;
use rw_keywords::cron::{self as schedule, DEFAULT_WINDOW_SECONDS};
use tracing::warn;

/// Cron subcommands
#[derive(Subcommand)]
pub enum CronCommands {
    /// Print whether the schedule fired within the last window
    Check {
        /// Five-field cron expression
        expression: String,

        /// Window in seconds
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_SECONDS)]
        window: u64,

        /// Reference time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Print the next firing time
    Next {
        expression: String,

        /// Reference time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Check that an expression parses
    Validate { expression: String },
}

/// Handle cron commands
pub fn handle_cron_command(command: CronCommands) -> Result<()> {
    match command {
        CronCommands::Check {
            expression,
            window,
            at,
        } => {
            let matched = schedule::check_schedule_match(&expression, window, at).unwrap_or_else(|e| {
                warn!("Error checking cron schedule: {}", e);
                false
            });
            println!("{}", matched);
        }
        CronCommands::Next { expression, at } => {
            match schedule::next_run_time(&expression, at) {
                Ok(next) => println!("{}", next),
                Err(e) => {
                    warn!("Error computing next run: {}", e);
                    println!("null");
                }
            }
        }
        CronCommands::Validate { expression } => {
            if schedule::validate_schedule(&expression) {
                println!("{} {}", "✓".green(), expression);
            } else {
                println!("{} {}", "✗".red(), expression);
                anyhow::bail!("invalid cron schedule: {}", expression);
            }
        }
    }

    Ok(())
}
