// ABOUTME: Deployment command implementation.
// ABOUTME: Sets or shows the deployment manifest recorded in the user config.

use cpi_deploy::config::UserConfig;
use cpi_deploy::error::{Error, Result};
use cpi_deploy::output::Output;
use std::path::Path;

pub fn deployment(config_path: &Path, manifest: Option<&Path>, output: &Output) -> Result<()> {
    let mut config = UserConfig::load(config_path)?;

    let Some(manifest) = manifest else {
        let current = config.deployment_file.ok_or(Error::NoDeploymentSet)?;
        output.success(&format!("Current deployment is '{}'", current.display()));
        return Ok(());
    };

    if !manifest.is_file() {
        return Err(Error::DeploymentNotFound(manifest.to_path_buf()));
    }
    let absolute = std::fs::canonicalize(manifest)?;

    config.deployment_file = Some(absolute.clone());
    config.save(config_path)?;
    tracing::debug!(config = %config_path.display(), "saved user config");

    output.success(&format!("Deployment set to '{}'", absolute.display()));
    Ok(())
}
