// ABOUTME: Materialises a release job into an executable location.
// ABOUTME: Templates are copied to their destinations; bin/ entries become executable.

use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use crate::release::{Job, is_plain_name};

/// A release job installed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledJob {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum JobInstallError {
    #[error("template '{template}' of job '{job}' is missing from the release")]
    MissingTemplate { job: String, template: String },

    #[error("job name '{0}' must be a single path component")]
    InvalidName(String),

    #[error("template source '{0}' must be a relative path inside the job's templates")]
    InvalidSource(String),

    #[error("template destination '{0}' must be a relative path inside the job")]
    InvalidDestination(String),

    #[error("writing '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait JobInstaller: Send + Sync {
    async fn install(&self, job: &Job) -> Result<InstalledJob, JobInstallError>;
}

/// Installs jobs under `<jobs_dir>/<job name>`, replacing any previous install.
#[derive(Debug, Clone)]
pub struct TemplateJobInstaller {
    jobs_dir: PathBuf,
}

impl TemplateJobInstaller {
    pub fn new(jobs_dir: impl Into<PathBuf>) -> Self {
        Self {
            jobs_dir: jobs_dir.into(),
        }
    }
}

fn is_relative_inside(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> JobInstallError + '_ {
    move |source| JobInstallError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl JobInstaller for TemplateJobInstaller {
    async fn install(&self, job: &Job) -> Result<InstalledJob, JobInstallError> {
        if !is_plain_name(&job.name) {
            return Err(JobInstallError::InvalidName(job.name.clone()));
        }
        let target = self.jobs_dir.join(&job.name);

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&target)
                .await
                .map_err(io_error(&target))?;
        }
        tokio::fs::create_dir_all(&target)
            .await
            .map_err(io_error(&target))?;

        for (source, destination) in &job.templates {
            if !is_relative_inside(Path::new(source)) {
                return Err(JobInstallError::InvalidSource(source.clone()));
            }
            let relative = Path::new(destination);
            if !is_relative_inside(relative) {
                return Err(JobInstallError::InvalidDestination(destination.clone()));
            }

            let src = job.extracted_path.join("templates").join(source);
            if !src.is_file() {
                return Err(JobInstallError::MissingTemplate {
                    job: job.name.clone(),
                    template: source.clone(),
                });
            }

            let dst = target.join(relative);
            if let Some(parent) = dst.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(io_error(parent))?;
            }
            tokio::fs::copy(&src, &dst).await.map_err(io_error(&dst))?;

            if relative.starts_with("bin") {
                tokio::fs::set_permissions(&dst, std::fs::Permissions::from_mode(0o755))
                    .await
                    .map_err(io_error(&dst))?;
            }
        }

        tracing::info!(job = %job.name, path = %target.display(), "installed job");
        Ok(InstalledJob {
            name: job.name.clone(),
            path: target,
        })
    }
}
