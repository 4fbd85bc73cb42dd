// ABOUTME: Deployment manifest parsing.
// ABOUTME: Produces the user manifest and the CPI deployment spec built from `cloud_provider`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Errors from reading a deployment manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("reading '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing YAML")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid manifest: {0}")]
    Invalid(String),
}

/// The deployment manifest as written by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentManifest {
    pub name: String,

    #[serde(default)]
    pub jobs: Vec<Job>,

    pub cloud_provider: CloudProvider,
}

/// The `cloud_provider` section describing how the CPI itself is deployed.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudProvider {
    pub mbus: String,

    #[serde(default)]
    pub properties: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Job {
    pub name: String,

    #[serde(default)]
    pub instances: u32,

    #[serde(default)]
    pub templates: Vec<TemplateRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateRef {
    pub name: String,
}

/// The fields needed to install and drive a CPI deployment. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CpiDeploymentSpec {
    pub name: String,
    pub mbus: String,
    pub properties: BTreeMap<String, serde_yaml::Value>,
    pub jobs: Vec<Job>,
}

impl CpiDeploymentSpec {
    /// Properties as the JSON object handed to the CPI. Fails on YAML maps with
    /// non-string keys, which JSON cannot express.
    pub fn properties_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.properties)
    }
}

impl DeploymentManifest {
    pub fn from_yaml(yaml: &str) -> Result<Self, ManifestError> {
        let manifest: DeploymentManifest = serde_yaml::from_str(yaml)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn cpi_spec(&self) -> CpiDeploymentSpec {
        CpiDeploymentSpec {
            name: self.name.clone(),
            mbus: self.cloud_provider.mbus.clone(),
            properties: self.cloud_provider.properties.clone(),
            jobs: self.cloud_provider.jobs.clone(),
        }
    }

    fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::Invalid("name must not be empty".to_string()));
        }
        if self.cloud_provider.mbus.trim().is_empty() {
            return Err(ManifestError::Invalid(
                "cloud_provider.mbus must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read and parse the manifest at `path`.
pub fn parse(path: &Path) -> Result<(DeploymentManifest, CpiDeploymentSpec), ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest = DeploymentManifest::from_yaml(&content)?;
    let spec = manifest.cpi_spec();
    Ok((manifest, spec))
}
