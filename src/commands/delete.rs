// ABOUTME: Delete command implementation.
// ABOUTME: Checks arguments, then runs the teardown and reports warnings.

use cpi_deploy::agent::HttpAgentClientFactory;
use cpi_deploy::config::UserConfig;
use cpi_deploy::cpi::LocalInstallerFactory;
use cpi_deploy::deploy::Teardown;
use cpi_deploy::diagnostics::Diagnostics;
use cpi_deploy::error::{Error, Result};
use cpi_deploy::eventlog::EventLogger;
use cpi_deploy::output::Output;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const EXPECTED_USAGE: &str = "Expected usage: cpi-deploy delete <cpi-release-tarball>";

/// Delete the configured deployment using the CPI release in `args`.
pub async fn delete(config_path: &Path, args: &[String], mut output: Output) -> Result<()> {
    let tarball = release_tarball(args)?;
    let user_config = UserConfig::load(config_path)?;

    output.start_timer();
    let output = Arc::new(output);
    let logger = EventLogger::new(output.clone());
    let mut diag = Diagnostics::default();

    let teardown = Teardown::new(
        Arc::new(LocalInstallerFactory),
        Arc::new(HttpAgentClientFactory),
        logger,
    );
    let result = teardown.delete(&user_config, &tarball, &mut diag).await;

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    result?;
    output.success("Deleted deployment");
    Ok(())
}

fn release_tarball(args: &[String]) -> Result<PathBuf> {
    match args {
        [tarball] => Ok(PathBuf::from(tarball)),
        _ => {
            tracing::error!(?args, "invalid arguments");
            Err(Error::Usage {
                message: "delete command requires exactly 1 argument".to_string(),
                expected: EXPECTED_USAGE,
            })
        }
    }
}
