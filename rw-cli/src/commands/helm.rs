//! Helm command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use rw_keywords::helm::Helm;
use rw_keywords::registry::{AcrClient, TagLister};
use rw_keywords::updates::{UpdateReport, update_release_images};
use tracing::warn;

use super::print_json;

/// Helm subcommands
#[derive(Subcommand)]
pub enum HelmCommands {
    /// Scan a release for images with newer registry tags
    Updates {
        /// Chart repository URL
        #[arg(long)]
        repo: String,

        /// Chart name in the repository
        #[arg(long)]
        chart: String,

        /// Release name
        #[arg(long)]
        release: String,

        /// Release namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Azure Container Registry as `registry.azurecr.io[,subscription]`
        #[arg(long, env = "AZURE_RESOURCE_DETAILS")]
        registry: Option<String>,

        /// ACR access token; obtained through `az` when omitted
        #[arg(long, env = "ACR_TOKEN", hide_env_values = true)]
        acr_token: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle helm commands
pub async fn handle_helm_command(command: HelmCommands) -> Result<()> {
    match command {
        HelmCommands::Updates {
            repo,
            chart,
            release,
            namespace,
            registry,
            acr_token,
            json,
        } => {
            let helm = Helm::new();
            helm.check_available().context("helm is not available")?;

            let acr = registry.as_deref().and_then(|details| {
                let host = AcrClient::parse_details(details);
                let client = match acr_token {
                    Some(token) => Ok(AcrClient::new(host, token)),
                    None => AcrClient::login(host),
                };
                client
                    .inspect_err(|e| warn!("Registry checks disabled: {}", e))
                    .ok()
            });
            let lister = acr.as_ref().map(|c| c as &dyn TagLister);

            let report =
                update_release_images(&helm, lister, &repo, &chart, &release, &namespace)
                    .await
                    .context("Failed to scan release for image updates")?;

            if json {
                print_json(&report)
            } else {
                print_report(&release, &report);
                Ok(())
            }
        }
    }
}

fn print_report(release: &str, report: &UpdateReport) {
    if !report.updates_available {
        println!("{}", format!("No image updates for {}.", release).green());
        return;
    }

    println!(
        "{}",
        format!("{} image update(s) for {}:", report.update_details.len(), release).bold()
    );
    println!();
    for update in &report.update_details {
        println!("  {} {}", "▸".cyan(), update.image.bold());
        println!(
            "    {} -> {}",
            update.current_tag.dimmed(),
            update.recommended_tag.green()
        );
        println!("    {}", update.update_command);
        println!();
    }
}
