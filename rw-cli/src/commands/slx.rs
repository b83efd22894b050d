//! SLX command handlers

use anyhow::{Result, anyhow};
use clap::Subcommand;
use colored::*;
use rw_core::domain::slx::Slx;
use rw_keywords::slx::parse_tag;
use rw_keywords::workspace;
use tracing::warn;

use super::print_json;
use crate::config::Config;

/// SLX subcommands
#[derive(Subcommand)]
pub enum SlxCommands {
    /// SLXs carrying any of the given tags
    ByTag {
        /// Tags as `name:value` (repeatable)
        #[arg(required = true)]
        tags: Vec<String>,

        /// Print full SLX documents as JSON
        #[arg(long)]
        json: bool,
    },
    /// SLXs mentioning any of the given entities
    Search {
        #[arg(required = true)]
        entities: Vec<String>,

        /// Print full SLX documents as JSON
        #[arg(long)]
        json: bool,
    },
    /// Short name of the SLX this process runs for
    Current,
    /// SLI interval of an SLX in seconds
    Interval {
        /// SLX short name, defaults to the current SLX
        slx: Option<String>,
    },
}

/// Handle SLX commands
///
/// # Arguments
/// * `command` - The SLX command to execute
/// * `config` - The CLI configuration
pub async fn handle_slx_command(command: SlxCommands, config: &Config) -> Result<()> {
    match command {
        SlxCommands::ByTag { tags, json } => {
            let tags = tags
                .iter()
                .map(|raw| parse_tag(raw).ok_or_else(|| anyhow!("invalid tag {:?}, expected name:value", raw)))
                .collect::<Result<Vec<_>>>()?;

            let client = config.client()?;
            let slxs = workspace::list_slxs_with_tags(&client, &tags)
                .await
                .unwrap_or_else(|e| {
                    warn!("Failed to list SLXs by tag: {}", e);
                    Vec::new()
                });
            print_slxs(&slxs, json)
        }
        SlxCommands::Search { entities, json } => {
            let client = config.client()?;
            let slxs = workspace::search_slxs(&client, &entities)
                .await
                .unwrap_or_else(|e| {
                    warn!("Failed to search SLXs: {}", e);
                    Vec::new()
                });
            print_slxs(&slxs, json)
        }
        SlxCommands::Current => {
            let client = config.client()?;
            let name = workspace::current_slx_short_name(&config.platform, &client).await?;
            println!("{}", name);
            Ok(())
        }
        SlxCommands::Interval { slx } => {
            let client = config.client()?;
            let slx = match slx {
                Some(slx) => slx,
                None => workspace::current_slx_short_name(&config.platform, &client).await?,
            };
            println!("{}", workspace::sli_interval_seconds(&client, &slx).await);
            Ok(())
        }
    }
}

fn print_slxs(slxs: &[Slx], json: bool) -> Result<()> {
    if json {
        return print_json(slxs);
    }

    if slxs.is_empty() {
        eprintln!("{}", "No SLXs found.".yellow());
        return Ok(());
    }

    eprintln!("{}", format!("Found {} SLX(s):", slxs.len()).bold());
    for slx in slxs {
        match &slx.spec.alias {
            Some(alias) => println!("{}  {}", slx.short_name(), alias.dimmed()),
            None => println!("{}", slx.short_name()),
        }
    }
    Ok(())
}
