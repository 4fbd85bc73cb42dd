// ABOUTME: CPI release installer: extract, validate, compile, install jobs, build a Cloud.
// ABOUTME: Extraction is separate from installation so callers own release cleanup.

mod compile;
mod install;

pub use compile::{CompileError, PackageCompiler, ReleaseCompiler, required_packages};
pub use install::{InstalledJob, JobInstallError, JobInstaller, TemplateJobInstaller};

use snafu::{ResultExt, Snafu, ensure};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cloud::{Cloud, CloudFactory, ExternalCloudFactory, FactoryError};
use crate::config;
use crate::error::Result as AppResult;
use crate::manifest::{CpiDeploymentSpec, Job as DeploymentJob};
use crate::release::{Release, ReleaseError, ReleaseValidator, read_release};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InstallError {
    #[snafu(display("CPI release '{}' does not exist", path.display()))]
    ReleaseNotFound { path: PathBuf },

    #[snafu(display("reading CPI release from '{}'", path.display()))]
    Read { path: PathBuf, source: ReleaseError },

    #[snafu(display("validating CPI release '{release}'"))]
    Validate {
        release: String,
        source: ReleaseError,
    },

    #[snafu(display("compiling CPI release '{release}'"))]
    Compile {
        release: String,
        source: CompileError,
    },

    #[snafu(display("invalid CPI deployment: exactly one job required, {count} jobs found"))]
    JobCount { count: usize },

    #[snafu(display(
        "invalid CPI deployment: exactly one instance required, found {count} instances in job '{job}'"
    ))]
    InstanceCount { job: String, count: u32 },

    #[snafu(display(
        "invalid CPI deployment manifest: job '{job}' not found in release '{release}'"
    ))]
    JobNotFound { job: String, release: String },

    #[snafu(display("installing '{job}' job for CPI release"))]
    InstallJob {
        job: String,
        source: JobInstallError,
    },

    #[snafu(display("invalid CPI deployment: validating job installation"))]
    InvalidDeployment { source: FactoryError },
}

/// Turns a CPI release tarball into a running `Cloud`.
#[derive(Clone)]
pub struct CpiInstaller {
    temp_root: PathBuf,
    validator: ReleaseValidator,
    compiler: Arc<dyn ReleaseCompiler>,
    job_installer: Arc<dyn JobInstaller>,
    cloud_factory: Arc<dyn CloudFactory>,
}

impl CpiInstaller {
    pub fn new(
        compiler: Arc<dyn ReleaseCompiler>,
        job_installer: Arc<dyn JobInstaller>,
        cloud_factory: Arc<dyn CloudFactory>,
    ) -> Self {
        Self {
            temp_root: std::env::temp_dir(),
            validator: ReleaseValidator,
            compiler,
            job_installer,
            cloud_factory,
        }
    }

    /// Extract releases under `root` instead of the system temp directory.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    /// Unpack, parse and validate a release tarball.
    ///
    /// The returned release owns its extraction directory; call `Release::delete` (or
    /// drop it) once the cloud no longer needs it.
    pub async fn extract(&self, tarball: &Path) -> Result<Release, InstallError> {
        ensure!(tarball.is_file(), ReleaseNotFoundSnafu { path: tarball });

        tracing::info!(tarball = %tarball.display(), "extracting CPI release");
        let release = read_release(tarball, &self.temp_root)
            .await
            .context(ReadSnafu { path: tarball })?;

        tracing::info!(release = %release.name, "validating CPI release");
        self.validator
            .validate(&release)
            .context(ValidateSnafu {
                release: release.name.clone(),
            })?;

        Ok(release)
    }

    /// Compile and install the release for `spec`, returning the cloud it provides.
    pub async fn install(
        &self,
        spec: &CpiDeploymentSpec,
        release: &Release,
    ) -> Result<Arc<dyn Cloud>, InstallError> {
        tracing::info!(release = %release.name, "compiling CPI release");
        self.compiler
            .compile(release, spec)
            .await
            .context(CompileSnafu {
                release: release.name.clone(),
            })?;

        let cpi_job = single_instance_job(spec)?;
        let installed = self.install_jobs(cpi_job, release).await?;

        self.cloud_factory
            .new_cloud(&installed)
            .context(InvalidDeploymentSnafu)
    }

    async fn install_jobs(
        &self,
        deployment_job: &DeploymentJob,
        release: &Release,
    ) -> Result<Vec<InstalledJob>, InstallError> {
        let mut installed = Vec::with_capacity(deployment_job.templates.len());
        for template in &deployment_job.templates {
            let job = release
                .find_job_by_name(&template.name)
                .ok_or_else(|| InstallError::JobNotFound {
                    job: template.name.clone(),
                    release: release.name.clone(),
                })?;

            let installed_job = self
                .job_installer
                .install(job)
                .await
                .context(InstallJobSnafu {
                    job: template.name.clone(),
                })?;
            installed.push(installed_job);
        }
        Ok(installed)
    }
}

/// Builds the installer for a parsed deployment.
///
/// The installation directory depends on the deployment name, which is only known once the
/// manifest has been read.
pub trait InstallerFactory: Send + Sync {
    fn new_installer(&self, spec: &CpiDeploymentSpec) -> AppResult<CpiInstaller>;
}

/// Installs under `$HOME/.cpi-deploy/installations/<deployment>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalInstallerFactory;

impl InstallerFactory for LocalInstallerFactory {
    fn new_installer(&self, spec: &CpiDeploymentSpec) -> AppResult<CpiInstaller> {
        let root = config::installation_dir(&spec.name)?;
        tracing::debug!(root = %root.display(), "using installation directory");
        Ok(CpiInstaller::new(
            Arc::new(PackageCompiler::new(root.join("packages"))),
            Arc::new(TemplateJobInstaller::new(root.join("jobs"))),
            Arc::new(ExternalCloudFactory::new(
                spec.name.clone(),
                spec.properties_json()?,
            )),
        ))
    }
}

/// A CPI is deployed as a singleton: one job with one instance.
fn single_instance_job(spec: &CpiDeploymentSpec) -> Result<&DeploymentJob, InstallError> {
    let [job] = spec.jobs.as_slice() else {
        return JobCountSnafu {
            count: spec.jobs.len(),
        }
        .fail();
    };
    ensure!(
        job.instances == 1,
        InstanceCountSnafu {
            job: job.name.clone(),
            count: job.instances,
        }
    );
    Ok(job)
}
