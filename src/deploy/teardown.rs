// ABOUTME: Teardown orchestration: validate, install and start the CPI, delete, stop.
// ABOUTME: Each transition consumes self, so the extracted release is dropped on every exit path.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::AgentClientFactory;
use crate::config::{self, StateHandle, UserConfig};
use crate::cpi::InstallerFactory;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, display_chain};
use crate::eventlog::{EventLogger, Stage};
use crate::manifest::{self, DeploymentManifest};
use crate::release::Release;

use super::error::DeployError;
use super::instance::{InstanceManager, PING_DELAY, PING_TIMEOUT};
use super::manager::{DiskManager, ResourceManager, StemcellManager};
use super::state::{CpiStarted, Done, Idle, Installed, Validated};

/// Collaborators shared by every state of a teardown.
struct Context {
    installers: Arc<dyn InstallerFactory>,
    agents: Arc<dyn AgentClientFactory>,
    logger: EventLogger,
    ping_timeout: Duration,
    ping_delay: Duration,
}

/// A teardown run, parameterized by how far it has progressed.
pub struct Teardown<S> {
    ctx: Context,
    state: S,
}

impl Teardown<Idle> {
    pub fn new(
        installers: Arc<dyn InstallerFactory>,
        agents: Arc<dyn AgentClientFactory>,
        logger: EventLogger,
    ) -> Self {
        Teardown {
            ctx: Context {
                installers,
                agents,
                logger,
                ping_timeout: PING_TIMEOUT,
                ping_delay: PING_DELAY,
            },
            state: Idle,
        }
    }

    /// Override the agent readiness wait timing.
    pub fn with_ping_timing(mut self, timeout: Duration, delay: Duration) -> Self {
        self.ctx.ping_timeout = timeout;
        self.ctx.ping_delay = delay;
        self
    }

    /// Run the whole teardown.
    ///
    /// Once the CPI has started it is always asked to stop, whether or not deletion
    /// succeeded. The returned result is the deletion outcome; stop and cleanup problems
    /// only add warnings to `diag`.
    pub async fn delete(
        self,
        user_config: &UserConfig,
        tarball: &Path,
        diag: &mut Diagnostics,
    ) -> Result<(), Error> {
        let installed = self.validate(user_config, tarball).await?.install().await?;
        let started = installed.start_cpi().await?;

        let result = started.delete_deployment(diag).await;
        started.stop_cpi(diag).await.finish(diag);
        result
    }

    /// Check the configured manifest and the CPI release, extracting the release.
    pub async fn validate(
        self,
        user_config: &UserConfig,
        tarball: &Path,
    ) -> Result<Teardown<Validated>, Error> {
        let mut stage = self.ctx.logger.new_stage("validating");
        stage.start();

        let (manifest, spec, deployment_state, installer) = stage
            .perform_step_with("Validating deployment manifest", async {
                let path = user_config
                    .deployment_file
                    .clone()
                    .ok_or(Error::NoDeploymentSet)?;

                tracing::info!(path = %path.display(), "checking for deployment");
                if !path.is_file() {
                    return Err(Error::DeploymentNotFound(path));
                }

                let (manifest, spec) =
                    manifest::parse(&path).map_err(|source| Error::ParseManifest {
                        path: path.clone(),
                        source,
                    })?;
                let deployment_state = StateHandle::load(&config::state_file_for(&path))?;
                let installer = self.ctx.installers.new_installer(&spec)?;

                Ok::<_, Error>((manifest, spec, deployment_state, installer))
            })
            .await?;

        let release = stage
            .perform_step_with("Validating cpi release", async {
                if !tarball.is_file() {
                    return Err(Error::ReleaseNotFound(tarball.to_path_buf()));
                }
                installer
                    .extract(tarball)
                    .await
                    .map_err(|source| Error::ExtractRelease {
                        path: tarball.to_path_buf(),
                        source,
                    })
            })
            .await?;

        stage.finish();

        Ok(Teardown {
            ctx: self.ctx,
            state: Validated {
                manifest,
                spec,
                deployment_state,
                installer,
                release,
            },
        })
    }
}

impl Teardown<Validated> {
    pub fn manifest(&self) -> &DeploymentManifest {
        &self.state.manifest
    }

    pub fn release(&self) -> &Release {
        &self.state.release
    }

    /// Compile and install the CPI release, obtaining a cloud handle.
    pub async fn install(self) -> Result<Teardown<Installed>, Error> {
        let Teardown { ctx, state } = self;

        tracing::info!(release = %state.release.name, "installing CPI release");
        let cloud = state
            .installer
            .install(&state.spec, &state.release)
            .await
            .map_err(Error::Install)?;

        Ok(Teardown {
            ctx,
            state: Installed {
                spec: state.spec,
                deployment_state: state.deployment_state,
                release: state.release,
                cloud,
            },
        })
    }
}

impl Teardown<Installed> {
    /// Start the CPI's jobs. Nothing has been deleted if this fails.
    pub async fn start_cpi(self) -> Result<Teardown<CpiStarted>, Error> {
        let Teardown { ctx, state } = self;

        state.cloud.start().await.map_err(Error::StartCpi)?;
        tracing::info!("started CPI jobs");

        Ok(Teardown {
            ctx,
            state: CpiStarted {
                spec: state.spec,
                deployment_state: state.deployment_state,
                release: state.release,
                cloud: state.cloud,
            },
        })
    }
}

impl Teardown<CpiStarted> {
    /// Delete the current deployment's resources, then sweep unused disks and stemcells.
    ///
    /// Persisted state is saved afterwards whatever the outcome.
    pub async fn delete_deployment(&self, diag: &mut Diagnostics) -> Result<(), Error> {
        let result = self.run_deleting_stage().await;

        if let Err(e) = self.state.deployment_state.save() {
            diag.warn(Warning::state_save(format!(
                "Failed to save deployment state: {}",
                display_chain(&e)
            )));
        }
        result
    }

    async fn run_deleting_stage(&self) -> Result<(), Error> {
        let cloud = &self.state.cloud;
        let deployment_state = &self.state.deployment_state;

        let agent = self
            .ctx
            .agents
            .new_client(&self.state.spec.mbus)
            .map_err(DeployError::AgentClient)?;
        let instances =
            InstanceManager::new(Arc::clone(cloud), deployment_state.clone(), agent);
        let disks = DiskManager::new(Arc::clone(cloud), deployment_state.clone());
        let stemcells = StemcellManager::new(Arc::clone(cloud), deployment_state.clone());

        let mut stage = self.ctx.logger.new_stage("deleting deployment");
        stage.start();

        let current_instances = instances.find_current().map_err(finding_current("instances"))?;
        let current_disk = disks.find_current().map_err(finding_current("disk"))?;
        let current_stemcell = stemcells.find_current().map_err(finding_current("stemcell"))?;

        for instance in &current_instances {
            instance
                .delete(self.ctx.ping_timeout, self.ctx.ping_delay, &mut stage)
                .await?;
        }

        if let Some(disk) = current_disk {
            let name = format!("Deleting disk '{}'", disk.cid());
            stage.perform_step(name, disk.delete_step()).await?;
        }

        if let Some(stemcell) = current_stemcell {
            let name = format!("Deleting stemcell '{}'", stemcell.cid());
            stage.perform_step(name, stemcell.delete_step()).await?;
        }

        sweep(&disks, &mut stage).await?;
        sweep(&stemcells, &mut stage).await?;

        stage.finish();
        Ok(())
    }

    /// Ask the CPI jobs to stop. Failure is only a warning.
    pub async fn stop_cpi(self, diag: &mut Diagnostics) -> Teardown<Done> {
        let Teardown { ctx, state } = self;

        match state.cloud.stop().await {
            Ok(()) => tracing::info!("stopped CPI jobs"),
            Err(e) => diag.warn(Warning::cpi_stop(format!(
                "CPI jobs failed to stop: {}",
                display_chain(&e)
            ))),
        }

        Teardown {
            ctx,
            state: Done {
                release: state.release,
            },
        }
    }
}

impl Teardown<Done> {
    /// Remove the extracted release.
    pub fn finish(self, diag: &mut Diagnostics) {
        let release = self.state.release;
        let path = release.extracted_path().to_path_buf();

        if let Err(e) = release.delete() {
            diag.warn(Warning::release_cleanup(format!(
                "Failed to delete extracted release '{}': {e}",
                path.display()
            )));
        }
    }
}

fn finding_current(what: &'static str) -> impl FnOnce(DeployError) -> Error {
    move |source| Error::FindCurrent { what, source }
}

async fn sweep<M: ResourceManager>(manager: &M, stage: &mut Stage) -> Result<(), Error> {
    manager.delete_unused(stage).await
}
