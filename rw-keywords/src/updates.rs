//! Helm release image update scan
//!
//! Pulls the release's chart, lists the images the release runs, asks the
//! registry whether each tag is still current and, for stale ones, builds the
//! `helm upgrade` command that would move the release forward.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::helm::{Helm, HelmError, ImageRef, generate_update_command};
use crate::registry::{RegistryError, TagLister, check_image_updates};

/// One stale image and how to update it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUpdate {
    pub image: String,
    pub current_tag: String,
    pub recommended_tag: String,
    pub update_command: String,
}

/// Outcome of a release scan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateReport {
    pub updates_available: bool,
    pub update_details: Vec<ImageUpdate>,
}

/// Scans a Helm release for images with newer tags
///
/// # Arguments
/// * `helm` - Helm CLI wrapper
/// * `lister` - Registry to check; with `None` no image is checked
/// * `repo_url` / `chart_name` - Chart to pull for its values
/// * `release` / `namespace` - Deployed release to inspect
///
/// # Errors
/// Only a failed chart pull is fatal. An unreadable release manifest yields
/// an empty report and per-image failures are logged and skipped.
pub async fn update_release_images(
    helm: &Helm,
    lister: Option<&dyn TagLister>,
    repo_url: &str,
    chart_name: &str,
    release: &str,
    namespace: &str,
) -> Result<UpdateReport, HelmError> {
    let chart_path = helm.pull_chart(chart_name, repo_url)?;

    let images = match helm.release_images(release, namespace) {
        Ok(images) => images,
        Err(e) => {
            warn!("Failed to get release images: {}", e);
            Vec::new()
        }
    };

    Ok(plan_updates(lister, &chart_path, release, namespace, &images).await)
}

/// Builds the report for a known set of images
pub async fn plan_updates(
    lister: Option<&dyn TagLister>,
    chart_path: &Path,
    release: &str,
    namespace: &str,
    images: &[String],
) -> UpdateReport {
    let mut report = UpdateReport::default();

    let Some(lister) = lister else {
        debug!("No registry configured, skipping {} image(s)", images.len());
        return report;
    };

    for image_full in images {
        let image = ImageRef::parse(image_full);

        let update = match check_image_updates(lister, &image.name, &image.tag).await {
            Ok(Some(update)) => update,
            Ok(None) => {
                debug!("{} is up to date", image_full);
                continue;
            }
            Err(RegistryError::ForeignImage { .. }) => {
                debug!("{} is not in {}, skipping", image_full, lister.registry());
                continue;
            }
            Err(e) => {
                warn!("Update check failed for {}: {}", image_full, e);
                continue;
            }
        };

        let Some(recommended) = update.recommended_tag else {
            warn!("No tags available for {}", image.name);
            continue;
        };

        match generate_update_command(release, namespace, chart_path, &image.name, &recommended) {
            Ok(update_command) => {
                info!(
                    "Update available for {}: {} -> {}",
                    image.name, update.current_tag, recommended
                );
                report.update_details.push(ImageUpdate {
                    image: image_full.clone(),
                    current_tag: update.current_tag,
                    recommended_tag: recommended,
                    update_command,
                });
            }
            Err(e) => warn!("Could not process update for {}: {}", image_full, e),
        }
    }

    report.updates_available = !report.update_details.is_empty();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::acr;

    fn chart_with_values(values: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("values.yaml"), values).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_plan_updates_reports_stale_images() {
        let chart = chart_with_values("api:\n  image: myacr.azurecr.io/team/api\n");
        let lister = acr("team/api", &["1.1.0", "1.3.0"]);
        let images = vec![
            "myacr.azurecr.io/team/api:1.2.0".to_string(),
            "docker.io/library/redis:7".to_string(),
        ];

        let report = plan_updates(Some(&lister), chart.path(), "api", "prod", &images).await;

        assert!(report.updates_available);
        assert_eq!(report.update_details.len(), 1);
        let update = &report.update_details[0];
        assert_eq!(update.image, "myacr.azurecr.io/team/api:1.2.0");
        assert_eq!(update.current_tag, "1.2.0");
        assert_eq!(update.recommended_tag, "1.3.0");
        assert!(update
            .update_command
            .contains("--set api.image=myacr.azurecr.io/team/api:1.3.0 -n prod"));
    }

    #[tokio::test]
    async fn test_plan_updates_skips_unlocatable_image() {
        let chart = chart_with_values("replicaCount: 1\n");
        let lister = acr("team/api", &["2.0.0"]);
        let images = vec!["myacr.azurecr.io/team/api:1.0.0".to_string()];

        let report = plan_updates(Some(&lister), chart.path(), "api", "prod", &images).await;
        assert_eq!(report, UpdateReport::default());
    }

    #[tokio::test]
    async fn test_plan_updates_without_registry() {
        let chart = chart_with_values("api:\n  image: myacr.azurecr.io/team/api\n");
        let images = vec!["myacr.azurecr.io/team/api:1.0.0".to_string()];

        let report = plan_updates(None, chart.path(), "api", "prod", &images).await;
        assert!(!report.updates_available);
    }

    #[test]
    fn test_report_serializes_with_snake_case_keys() {
        let value = serde_json::to_value(UpdateReport::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"updates_available": false, "update_details": []})
        );
    }
}
