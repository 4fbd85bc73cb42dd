// ABOUTME: Compiles the packages a CPI deployment needs, dependencies first.
// ABOUTME: Each package's `packaging` script builds into its install target.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::process::Command;

use crate::manifest::CpiDeploymentSpec;
use crate::release::{Package, Release};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("package '{0}' is not in the release")]
    MissingPackage(String),

    #[error("package dependency cycle through '{0}'")]
    DependencyCycle(String),

    #[error("package '{0}' has no packaging script")]
    MissingPackagingScript(String),

    #[error("packaging script for '{package}' exited with {status}: {stderr}")]
    ScriptFailed {
        package: String,
        status: String,
        stderr: String,
    },

    #[error("compiling '{package}'")]
    Io {
        package: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait ReleaseCompiler: Send + Sync {
    /// Build every package the deployment's jobs need. Artifacts land on disk.
    async fn compile(&self, release: &Release, spec: &CpiDeploymentSpec)
    -> Result<(), CompileError>;
}

/// Runs packaging scripts with `sh`, installing into `<packages_dir>/<name>`.
#[derive(Debug, Clone)]
pub struct PackageCompiler {
    packages_dir: PathBuf,
}

impl PackageCompiler {
    pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
        }
    }

    async fn compile_package(&self, package: &Package) -> Result<(), CompileError> {
        let io_err = |source| CompileError::Io {
            package: package.name.clone(),
            source,
        };

        let script = package.extracted_path.join("packaging");
        if !script.is_file() {
            return Err(CompileError::MissingPackagingScript(package.name.clone()));
        }

        let install_target = self.packages_dir.join(&package.name);
        if tokio::fs::try_exists(&install_target).await.unwrap_or(false) {
            tokio::fs::remove_dir_all(&install_target)
                .await
                .map_err(io_err)?;
        }
        tokio::fs::create_dir_all(&install_target)
            .await
            .map_err(io_err)?;

        tracing::info!(package = %package.name, "compiling package");
        let output = Command::new("sh")
            .arg("-e")
            .arg(&script)
            .current_dir(&package.extracted_path)
            .env("BOSH_COMPILE_TARGET", &package.extracted_path)
            .env("BOSH_INSTALL_TARGET", &install_target)
            .env("BOSH_PACKAGES_DIR", &self.packages_dir)
            .output()
            .await
            .map_err(io_err)?;

        if !output.status.success() {
            return Err(CompileError::ScriptFailed {
                package: package.name.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ReleaseCompiler for PackageCompiler {
    async fn compile(
        &self,
        release: &Release,
        spec: &CpiDeploymentSpec,
    ) -> Result<(), CompileError> {
        for package in required_packages(release, spec)? {
            self.compile_package(package).await?;
        }
        Ok(())
    }
}

/// Packages the deployment's jobs need, ordered so dependencies come first.
///
/// Templates that name no job in the release are ignored here; installation reports them.
pub fn required_packages<'r>(
    release: &'r Release,
    spec: &CpiDeploymentSpec,
) -> Result<Vec<&'r Package>, CompileError> {
    let mut order = Vec::new();
    let mut done = HashSet::new();
    let mut visiting = HashSet::new();

    let roots = spec
        .jobs
        .iter()
        .flat_map(|job| &job.templates)
        .filter_map(|template| release.find_job_by_name(&template.name))
        .flat_map(|job| &job.packages);

    for name in roots {
        visit(release, name, &mut visiting, &mut done, &mut order)?;
    }
    Ok(order)
}

fn visit<'r>(
    release: &'r Release,
    name: &str,
    visiting: &mut HashSet<String>,
    done: &mut HashSet<String>,
    order: &mut Vec<&'r Package>,
) -> Result<(), CompileError> {
    if done.contains(name) {
        return Ok(());
    }
    if !visiting.insert(name.to_string()) {
        return Err(CompileError::DependencyCycle(name.to_string()));
    }

    let package = release
        .find_package_by_name(name)
        .ok_or_else(|| CompileError::MissingPackage(name.to_string()))?;
    for dependency in &package.dependencies {
        visit(release, dependency, visiting, done, order)?;
    }

    visiting.remove(name);
    done.insert(name.to_string());
    order.push(package);
    Ok(())
}
