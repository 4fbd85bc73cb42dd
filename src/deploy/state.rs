// ABOUTME: Teardown state marker types for the type state pattern.
// ABOUTME: Each state carries exactly the data that exists at that point of the run.

use std::sync::Arc;

use crate::cloud::Cloud;
use crate::config::StateHandle;
use crate::cpi::CpiInstaller;
use crate::manifest::{CpiDeploymentSpec, DeploymentManifest};
use crate::release::Release;

/// Initial state: nothing validated yet.
/// Available actions: `validate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

/// Manifest parsed and release extracted.
/// Available actions: `install()`
pub struct Validated {
    pub(crate) manifest: DeploymentManifest,
    pub(crate) spec: CpiDeploymentSpec,
    pub(crate) deployment_state: StateHandle,
    pub(crate) installer: CpiInstaller,
    pub(crate) release: Release,
}

/// CPI compiled and installed.
/// Available actions: `start_cpi()`
pub struct Installed {
    pub(crate) spec: CpiDeploymentSpec,
    pub(crate) deployment_state: StateHandle,
    pub(crate) release: Release,
    pub(crate) cloud: Arc<dyn Cloud>,
}

/// CPI jobs running.
/// Available actions: `delete_deployment()`, `stop_cpi()`
pub struct CpiStarted {
    pub(crate) spec: CpiDeploymentSpec,
    pub(crate) deployment_state: StateHandle,
    pub(crate) release: Release,
    pub(crate) cloud: Arc<dyn Cloud>,
}

/// CPI stopped; only the release remains to clean up.
/// Available actions: `finish()`
pub struct Done {
    pub(crate) release: Release,
}
