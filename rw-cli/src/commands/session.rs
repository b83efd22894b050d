//! RunSession command handlers

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use colored::*;
use rw_keywords::PollConfig;
use rw_keywords::poller::{PollError, wait_for_stable_runsession};
use rw_keywords::runsession::{self as report, SummaryFormat};
use rw_keywords::workspace;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use super::print_json;
use crate::config::Config;

/// Where a RunSession document comes from
#[derive(Args)]
pub struct SessionInput {
    /// RunSession JSON file, `-` for stdin
    #[arg(long)]
    file: Option<PathBuf>,

    /// RunSession ID to fetch when no file is given
    #[arg(long, env = "RW_SESSION_ID")]
    id: Option<String>,
}

/// Session subcommands
#[derive(Subcommand)]
pub enum SessionCommands {
    /// Count open issues
    Issues {
        #[command(flatten)]
        input: SessionInput,
    },
    /// List open issues as JSON
    OpenIssues {
        #[command(flatten)]
        input: SessionInput,
    },
    /// Markdown report of open issues, most severe first
    Report {
        #[command(flatten)]
        input: SessionInput,
    },
    /// Who requested work and which personas ran it
    Summary {
        #[command(flatten)]
        input: SessionInput,

        /// `text` or `markdown`
        #[arg(long, default_value = "text")]
        format: SummaryFormat,
    },
    /// Backtick-quoted keywords in open issue titles
    Keywords {
        #[command(flatten)]
        input: SessionInput,
    },
    /// Keyword quoted most often across issue titles
    Resource {
        #[command(flatten)]
        input: SessionInput,
    },
    /// Wait until a RunSession stops gaining RunRequests
    WaitStable {
        /// JSON record referencing the RunSession, `-` for stdin
        record: String,

        /// Seconds between fetches
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Seconds to wait before giving up
        #[arg(long, default_value_t = 300)]
        max_wait: u64,

        /// Identical consecutive counts that mean stable
        #[arg(long, default_value_t = 3)]
        threshold: u32,
    },
    /// Print a RunSession as the server returns it
    Details {
        /// RunSession ID
        #[arg(env = "RW_SESSION_ID")]
        id: String,
    },
    /// Add a RunRequest running every task of an SLX
    RunTasks {
        /// SLX short name
        slx: String,

        /// RunSession to extend
        #[arg(long, env = "RW_SESSION_ID")]
        session: String,
    },
}

/// Handle session commands
///
/// # Arguments
/// * `command` - The session command to execute
/// * `config` - The CLI configuration
pub async fn handle_session_command(command: SessionCommands, config: &Config) -> Result<()> {
    match command {
        SessionCommands::Issues { input } => {
            let count = load(&input, config)
                .await
                .and_then(|data| Ok(report::count_open_issues(&data)?));
            println!("{}", or_default(count, "count open issues", 0));
        }
        SessionCommands::OpenIssues { input } => {
            let issues = load(&input, config)
                .await
                .and_then(|data| Ok(report::open_issues(&data)?));
            print_json(&or_default(issues, "list open issues", Vec::new()))?;
        }
        SessionCommands::Report { input } => {
            let issues = load(&input, config)
                .await
                .and_then(|data| Ok(report::open_issues(&data)?));
            let issues = or_default(issues, "build issue report", Vec::new());
            if issues.is_empty() {
                eprintln!("{}", "No open issues.".green());
            }
            print!("{}", report::open_issue_markdown(&issues));
        }
        SessionCommands::Summary { input, format } => {
            let summary = load(&input, config)
                .await
                .and_then(|data| Ok(report::requester_summary(&data, format)?));
            print!("{}", or_default(summary, "summarize requesters", String::new()));
        }
        SessionCommands::Keywords { input } => {
            let keywords = load(&input, config)
                .await
                .and_then(|data| Ok(report::open_issue_keywords(&data)?));
            print_json(&or_default(keywords, "extract keywords", Vec::new()))?;
        }
        SessionCommands::Resource { input } => {
            let resource = load(&input, config)
                .await
                .and_then(|data| Ok(report::most_referenced_resource(&data)?));
            println!(
                "{}",
                or_default(resource, "find referenced resource", report::NOT_FOUND.to_string())
            );
        }
        SessionCommands::WaitStable {
            record,
            interval,
            max_wait,
            threshold,
        } => {
            let record = if record == "-" { read_stdin()? } else { record };
            let mut poll = PollConfig::new(Duration::from_secs(interval), Duration::from_secs(max_wait));
            poll.stable_observations = threshold;
            poll.validate()?;

            match wait_for_stable_runsession(config.client()?, &record, poll).await {
                Ok(snapshot) => println!("{}", snapshot),
                Err(e @ PollError::Timeout { .. }) => return Err(e.into()),
                Err(e) => {
                    warn!("RunSession did not settle: {}", e);
                    println!("null");
                }
            }
        }
        SessionCommands::Details { id } => {
            let client = config.client()?;
            let details = workspace::runsession_details(&client, &id)
                .await
                .with_context(|| format!("Failed to fetch RunSession {}", id))?;
            print_json(&details)?;
        }
        SessionCommands::RunTasks { slx, session } => {
            let client = config.client()?;
            let updated = workspace::run_tasks_for_slx(&client, &slx, &session)
                .await
                .with_context(|| format!("Failed to add tasks of {} to RunSession {}", slx, session))?;

            eprintln!("{} Added {} to RunSession {}", "✓".green(), slx.bold(), session);
            if let Some(link) = config.platform.runsession_link(&session) {
                eprintln!("  {}", link.dimmed());
            }
            print_json(&updated)?;
        }
    }

    Ok(())
}

/// Reads the RunSession document from a file, stdin or the API
async fn load(input: &SessionInput, config: &Config) -> Result<String> {
    if let Some(path) = &input.file {
        if path.as_os_str() == "-" {
            return read_stdin();
        }
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()));
    }

    let Some(id) = input.id.as_deref() else {
        bail!("No RunSession given (use --file or --id, or set RW_SESSION_ID)");
    };

    let client = config.client()?;
    let session = workspace::runsession_details(&client, id)
        .await
        .with_context(|| format!("Failed to fetch RunSession {}", id))?;
    Ok(session.to_string())
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}

/// Logs a failed read and substitutes `default`
fn or_default<T>(result: Result<T>, action: &str, default: T) -> T {
    result.unwrap_or_else(|e| {
        warn!("Failed to {}: {:#}", action, e);
        default
    })
}
