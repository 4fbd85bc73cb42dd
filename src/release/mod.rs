// ABOUTME: Extracted release model: jobs, packages, and the temp directory holding them.
// ABOUTME: A Release owns its extraction directory and removes it on delete or drop.

mod error;
mod manifest;
mod reader;
mod validation;

pub use error::ReleaseError;
pub use manifest::{JobManifest, ReleaseManifest};
pub use reader::read_release;
pub use validation::ReleaseValidator;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;

/// True when `name` is exactly one normal path component, so joining it onto a
/// directory can never leave that directory.
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('/')
}

/// A release extracted to disk.
#[derive(Debug)]
pub struct Release {
    pub name: String,
    pub version: String,
    pub jobs: Vec<Job>,
    pub packages: Vec<Package>,
    extracted: TempDir,
}

/// A job definition inside a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub version: String,
    pub fingerprint: String,
    pub sha1: String,
    /// Template source (under `templates/`) to install destination.
    pub templates: BTreeMap<String, String>,
    /// Names of packages the job depends on.
    pub packages: Vec<String>,
    pub extracted_path: PathBuf,
}

/// A package inside a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub fingerprint: String,
    pub sha1: String,
    pub dependencies: Vec<String>,
    pub extracted_path: PathBuf,
}

impl Release {
    pub(crate) fn new(
        name: String,
        version: String,
        jobs: Vec<Job>,
        packages: Vec<Package>,
        extracted: TempDir,
    ) -> Self {
        Self {
            name,
            version,
            jobs,
            packages,
            extracted,
        }
    }

    /// Directory the release was unpacked into.
    pub fn extracted_path(&self) -> &Path {
        self.extracted.path()
    }

    pub fn find_job_by_name(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn find_package_by_name(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Remove the extraction directory.
    ///
    /// Dropping a release also removes it; this variant reports failures.
    pub fn delete(self) -> std::io::Result<()> {
        tracing::debug!(release = %self.name, path = %self.extracted.path().display(), "deleting extracted release");
        self.extracted.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_single_components() {
        assert!(is_plain_name("cpi"));
        assert!(is_plain_name("aws_cpi-2.0"));
        for name in ["", ".", "..", "../packages", "jobs/cpi", "cpi/", "/etc"] {
            assert!(!is_plain_name(name), "{name:?} should be rejected");
        }
    }
}
