// ABOUTME: Structural validation of an extracted release.
// ABOUTME: Collects every problem before failing so the user sees them all at once.

use std::collections::HashSet;

use super::{Release, ReleaseError, is_plain_name};

/// Checks required fields and that job/package references resolve.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseValidator;

impl ReleaseValidator {
    pub fn validate(&self, release: &Release) -> Result<(), ReleaseError> {
        let mut problems = Vec::new();

        if release.name.is_empty() {
            problems.push("release name is missing".to_string());
        }
        if release.version.is_empty() {
            problems.push("release version is missing".to_string());
        }

        let package_names: HashSet<&str> =
            release.packages.iter().map(|p| p.name.as_str()).collect();

        let mut seen_jobs = HashSet::new();
        for (index, job) in release.jobs.iter().enumerate() {
            if job.name.is_empty() {
                problems.push(format!("job {index} has no name"));
                continue;
            }
            if !is_plain_name(&job.name) {
                problems.push(path_name_problem("job", &job.name));
                continue;
            }
            if !seen_jobs.insert(job.name.as_str()) {
                problems.push(format!("job '{}' is defined more than once", job.name));
            }
            if job.version.is_empty() {
                problems.push(format!("job '{}' has no version", job.name));
            }
            if !job.extracted_path.is_dir() {
                problems.push(format!("job '{}' was not extracted", job.name));
            }
            for package in &job.packages {
                if !package_names.contains(package.as_str()) {
                    problems.push(format!(
                        "job '{}' requires package '{}' which is not in the release",
                        job.name, package
                    ));
                }
            }
        }

        let mut seen_packages = HashSet::new();
        for (index, package) in release.packages.iter().enumerate() {
            if package.name.is_empty() {
                problems.push(format!("package {index} has no name"));
                continue;
            }
            if !is_plain_name(&package.name) {
                problems.push(path_name_problem("package", &package.name));
                continue;
            }
            if !seen_packages.insert(package.name.as_str()) {
                problems.push(format!("package '{}' is defined more than once", package.name));
            }
            if !package.extracted_path.is_dir() {
                problems.push(format!("package '{}' was not extracted", package.name));
            }
            for dependency in &package.dependencies {
                if !package_names.contains(dependency.as_str()) {
                    problems.push(format!(
                        "package '{}' depends on '{}' which is not in the release",
                        package.name, dependency
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ReleaseError::Invalid { problems })
        }
    }
}

pub(crate) fn path_name_problem(kind: &str, name: &str) -> String {
    format!("{kind} name '{name}' must be a single path component")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{Job, Package};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn release(jobs: Vec<Job>, packages: Vec<Package>) -> Release {
        let dir = TempDir::new().unwrap();
        Release::new("cpi".to_string(), "1".to_string(), jobs, packages, dir)
    }

    fn job(name: &str, packages: &[&str], root: &std::path::Path) -> Job {
        let path = root.join(name);
        std::fs::create_dir_all(&path).unwrap();
        Job {
            name: name.to_string(),
            version: "1".to_string(),
            fingerprint: "f".to_string(),
            sha1: "s".to_string(),
            templates: BTreeMap::new(),
            packages: packages.iter().map(|s| s.to_string()).collect(),
            extracted_path: path,
        }
    }

    fn package(name: &str, deps: &[&str], root: &std::path::Path) -> Package {
        let path = root.join(name);
        std::fs::create_dir_all(&path).unwrap();
        Package {
            name: name.to_string(),
            version: "1".to_string(),
            fingerprint: "f".to_string(),
            sha1: "s".to_string(),
            dependencies: deps.iter().map(|s| s.to_string()).collect(),
            extracted_path: path,
        }
    }

    #[test]
    fn accepts_consistent_release() {
        let root = TempDir::new().unwrap();
        let release = release(
            vec![job("cpi", &["cpi_pkg"], root.path())],
            vec![
                package("ruby", &[], root.path()),
                package("cpi_pkg", &["ruby"], root.path()),
            ],
        );

        assert!(ReleaseValidator.validate(&release).is_ok());
    }

    #[test]
    fn reports_every_unresolved_reference() {
        let root = TempDir::new().unwrap();
        let release = release(
            vec![job("cpi", &["missing_a"], root.path())],
            vec![package("cpi_pkg", &["missing_b"], root.path())],
        );

        let err = ReleaseValidator.validate(&release).unwrap_err();
        let problems = err.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("missing_a"));
        assert!(problems[1].contains("missing_b"));
    }

    #[test]
    fn rejects_names_that_leave_their_directory() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("jobs");
        let release = release(
            vec![job("../packages", &[], &nested)],
            vec![package("../../ruby", &[], &nested.join("a"))],
        );

        let err = ReleaseValidator.validate(&release).unwrap_err();
        assert_eq!(
            err.problems(),
            [
                "job name '../packages' must be a single path component",
                "package name '../../ruby' must be a single path component",
            ]
        );
    }

    #[test]
    fn rejects_duplicate_jobs() {
        let root = TempDir::new().unwrap();
        let release = release(
            vec![job("cpi", &[], root.path()), job("cpi", &[], root.path())],
            vec![],
        );

        let err = ReleaseValidator.validate(&release).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
