//! Helm CLI integration
//!
//! Handles the Helm side of image update detection:
//! - Pulling and unpacking a chart into a temporary directory
//! - Reading a release manifest and extracting its image references
//! - Locating an image in chart values and building a `helm upgrade` command
//!
//! The upgrade command is only constructed, never executed.

use regex::Regex;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, error, info, warn};

static IMAGE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"image:\s*([^\s]+)").expect("image pattern is valid"));

#[derive(Debug, Error)]
pub enum HelmError {
    #[error("I/O error running helm: {0}")]
    Io(#[from] std::io::Error),

    #[error("{command} failed (exit code {code}): {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("no content found in the Helm chart directory {0}")]
    EmptyChart(PathBuf),

    #[error("could not find update path for image {0}")]
    ImagePathNotFound(String),
}

/// Thin wrapper over the `helm` binary
#[derive(Debug, Clone)]
pub struct Helm {
    binary: String,
}

impl Default for Helm {
    fn default() -> Self {
        Self::new()
    }
}

impl Helm {
    /// Uses `helm` from `PATH`
    pub fn new() -> Self {
        Self::with_binary("helm")
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Checks that helm is installed and runnable
    pub fn check_available(&self) -> Result<String, HelmError> {
        let version = self.run(&["version", "--short"])?;
        info!("Helm is available: {}", version.trim());
        Ok(version.trim().to_string())
    }

    /// Pulls a chart from a repository and unpacks it
    ///
    /// # Arguments
    /// * `chart_name` - Chart to pull
    /// * `repo_url` - Chart repository URL
    ///
    /// # Returns
    /// Path to the unpacked chart inside a fresh `helm-chart-*` temp dir.
    /// The directory is left in place for the caller.
    pub fn pull_chart(&self, chart_name: &str, repo_url: &str) -> Result<PathBuf, HelmError> {
        let chart_dir = tempfile::Builder::new()
            .prefix("helm-chart-")
            .tempdir()?
            .keep();

        info!(
            "Pulling chart {} from {} into {}",
            chart_name,
            repo_url,
            chart_dir.display()
        );

        let destination = chart_dir.to_string_lossy().to_string();
        self.run(&[
            "pull",
            chart_name,
            "--repo",
            repo_url,
            "--untar",
            "--destination",
            &destination,
        ])?;

        let mut entries: Vec<PathBuf> = std::fs::read_dir(&chart_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        entries.sort();

        entries
            .into_iter()
            .next()
            .ok_or(HelmError::EmptyChart(chart_dir))
    }

    /// Rendered manifest of a deployed release
    pub fn release_manifest(&self, release: &str, namespace: &str) -> Result<String, HelmError> {
        self.run(&["get", "manifest", release, "-n", namespace])
    }

    /// Distinct image references deployed by a release
    pub fn release_images(&self, release: &str, namespace: &str) -> Result<Vec<String>, HelmError> {
        let manifest = self.release_manifest(release, namespace)?;
        let images = extract_images(&manifest);
        debug!(
            "Release {}/{} references {} image(s)",
            namespace,
            release,
            images.len()
        );
        Ok(images)
    }

    /// Runs helm and returns stdout, failing on a non-zero exit
    fn run(&self, args: &[&str]) -> Result<String, HelmError> {
        debug!("Running {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary).args(args).output()?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stderr.trim().is_empty() {
            debug!("helm stderr: {}", stderr.trim());
        }

        if !output.status.success() {
            let command = format!("{} {}", self.binary, args.first().copied().unwrap_or_default());
            let code = output.status.code().unwrap_or(-1);
            error!("{} failed: exit_code={} stderr='{}'", command, code, stderr.trim());
            return Err(HelmError::CommandFailed {
                command,
                code,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

/// Image references found on `image:` lines, deduplicated and sorted
pub fn extract_images(manifest: &str) -> Vec<String> {
    let images: BTreeSet<String> = IMAGE_LINE
        .captures_iter(manifest)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|image| !image.is_empty())
        .collect();

    images.into_iter().collect()
}

/// An image reference split into repository and tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub tag: String,
}

impl ImageRef {
    /// Splits `registry[:port]/repo[:tag]`; the tag defaults to `latest`
    pub fn parse(reference: &str) -> Self {
        let without_digest = reference.split('@').next().unwrap_or(reference);
        let last_slash = without_digest.rfind('/').map(|i| i + 1).unwrap_or(0);

        match without_digest[last_slash..].rfind(':') {
            Some(colon) => {
                let split = last_slash + colon;
                Self {
                    name: without_digest[..split].to_string(),
                    tag: without_digest[split + 1..].to_string(),
                }
            }
            None => Self {
                name: without_digest.to_string(),
                tag: "latest".to_string(),
            },
        }
    }

    /// Last path segment of the repository, as it usually appears in values
    pub fn base_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Splits an image reference into name and tag
pub fn parse_image_reference(reference: &str) -> ImageRef {
    ImageRef::parse(reference.trim())
}

/// Dotted path of the first string value mentioning `image`'s base name
///
/// Mapping keys join with `.`, sequence positions with `[i]`, matching
/// `helm --set` syntax.
pub fn find_image_path(values: &YamlValue, image: &str) -> Option<String> {
    let target = image.rsplit('/').next().unwrap_or(image);
    if target.is_empty() {
        return None;
    }
    search(values, target, "")
}

fn search(node: &YamlValue, target: &str, path: &str) -> Option<String> {
    match node {
        YamlValue::Mapping(map) => {
            for (key, value) in map {
                let key = match key {
                    YamlValue::String(s) => s.clone(),
                    YamlValue::Number(n) => n.to_string(),
                    YamlValue::Bool(b) => b.to_string(),
                    _ => continue,
                };
                let child = if path.is_empty() {
                    key
                } else {
                    format!("{}.{}", path, key)
                };

                if let YamlValue::String(s) = value {
                    if s.contains(target) {
                        return Some(child);
                    }
                }

                if let Some(found) = search(value, target, &child) {
                    return Some(found);
                }
            }
            None
        }
        YamlValue::Sequence(items) => items.iter().enumerate().find_map(|(i, item)| {
            let child = format!("{}[{}]", path, i);
            match item {
                YamlValue::String(s) if s.contains(target) => Some(child),
                _ => search(item, target, &child),
            }
        }),
        YamlValue::Tagged(tagged) => search(&tagged.value, target, path),
        _ => None,
    }
}

/// Looks up `image` in a chart's `values.yaml`
///
/// Unreadable or unparseable values yield `None`.
pub fn find_image_path_in_chart(chart_path: &Path, image: &str) -> Option<String> {
    let values_file = chart_path.join("values.yaml");
    let raw = match std::fs::read_to_string(&values_file) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Error reading {}: {}", values_file.display(), e);
            return None;
        }
    };

    find_image_path_in_yaml(&raw, image)
}

/// [`find_image_path`] over YAML text; unparseable text yields `None`
pub fn find_image_path_in_yaml(values: &str, image: &str) -> Option<String> {
    match serde_yaml::from_str::<YamlValue>(values) {
        Ok(values) => find_image_path(&values, image),
        Err(e) => {
            warn!("Error parsing chart values: {}", e);
            None
        }
    }
}

/// Builds the `helm upgrade` command that moves `image` to `new_tag`
///
/// # Errors
/// `ImagePathNotFound` when the chart values never mention the image.
pub fn generate_update_command(
    release: &str,
    namespace: &str,
    chart_path: &Path,
    image: &str,
    new_tag: &str,
) -> Result<String, HelmError> {
    let update_path = find_image_path_in_chart(chart_path, image)
        .ok_or_else(|| HelmError::ImagePathNotFound(image.to_string()))?;

    Ok(format!(
        "helm upgrade {} {} --set {}={}:{} -n {}",
        release,
        chart_path.display(),
        update_path,
        image,
        new_tag,
        namespace
    ))
}
