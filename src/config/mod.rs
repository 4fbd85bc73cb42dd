// ABOUTME: User configuration and on-disk locations for cpi-deploy.
// ABOUTME: Tracks the selected deployment manifest and derives state/installation paths.

mod state;

pub use state::{DeploymentState, DiskRecord, InstanceRecord, StateHandle, StemcellRecord, VmRecord};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONFIG_DIR: &str = ".cpi-deploy";
pub const CONFIG_FILENAME: &str = "config.json";
pub const STATE_FILENAME: &str = "deployment.json";

/// Settings persisted between invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_file: Option<PathBuf>,
}

impl UserConfig {
    /// Default config path: `$HOME/.cpi-deploy/config.json`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(base_dir()?.join(CONFIG_FILENAME))
    }

    /// Load the config at `path`. A missing file yields the default config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// State lives next to the manifest it describes.
pub fn state_file_for(manifest: &Path) -> PathBuf {
    manifest
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(STATE_FILENAME)
}

/// Where the CPI for `deployment` is compiled and installed.
pub fn installation_dir(deployment: &str) -> Result<PathBuf> {
    Ok(base_dir()?.join("installations").join(deployment))
}

fn base_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME").ok_or_else(|| {
        Error::InvalidConfig("HOME is not set; cannot locate configuration".to_string())
    })?;
    Ok(PathBuf::from(home).join(CONFIG_DIR))
}
