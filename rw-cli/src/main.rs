//! RunWhen keyword CLI
//!
//! Command-line front end for the keyword library: cron checks, Helm image
//! update scans, RunSession reports and workspace lookups.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rw")]
#[command(about = "RunWhen workspace keywords", long_about = None)]
struct Cli {
    /// Workspace API root
    #[arg(long, env = "RW_WORKSPACE_API_URL", global = true)]
    api_url: Option<String>,

    /// Workspace name
    #[arg(long, env = "RW_WORKSPACE", global = true)]
    workspace: Option<String>,

    /// Bearer token for the workspace API
    #[arg(long, env = "RW_USER_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rw_cli=info,rw_keywords=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env().with_overrides(cli.api_url, cli.workspace, cli.token);

    handle_command(cli.command, &config).await
}
