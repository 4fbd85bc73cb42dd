// ABOUTME: Unpacks a gzipped release tarball and its nested job/package archives.
// ABOUTME: Produces a Release that owns the temporary extraction directory.

use flate2::read::GzDecoder;
use snafu::ResultExt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::error::{
    CreateTempDirSnafu, InvalidSnafu, ParseManifestSnafu, ReadManifestSnafu, ReleaseError,
    TaskSnafu, UnpackSnafu,
};
use super::manifest::{JobManifest, ReleaseManifest};
use super::validation::path_name_problem;
use super::{Job, Package, Release, is_plain_name};

const RELEASE_MANIFEST: &str = "release.MF";
const JOB_MANIFEST: &str = "job.MF";

/// Extract `tarball` into a fresh directory under `temp_root` and parse it.
///
/// The extraction directory is created only once the tarball has been opened, and
/// is removed again if any later step fails.
pub async fn read_release(tarball: &Path, temp_root: &Path) -> Result<Release, ReleaseError> {
    let tarball = tarball.to_owned();
    let temp_root = temp_root.to_owned();
    tokio::task::spawn_blocking(move || read_release_sync(&tarball, &temp_root))
        .await
        .context(TaskSnafu)?
}

fn read_release_sync(tarball: &Path, temp_root: &Path) -> Result<Release, ReleaseError> {
    let file = File::open(tarball).context(UnpackSnafu { path: tarball })?;

    let extracted = tempfile::Builder::new()
        .prefix("cpi-release-")
        .tempdir_in(temp_root)
        .context(CreateTempDirSnafu)?;

    unpack(file, tarball, extracted.path())?;

    let manifest_path = extracted.path().join(RELEASE_MANIFEST);
    let manifest: ReleaseManifest = read_yaml(&manifest_path)?;
    check_archive_names(&manifest)?;

    let jobs = manifest
        .jobs
        .iter()
        .map(|job_ref| {
            let dir = extracted.path().join("jobs").join(&job_ref.name);
            let archive = extracted
                .path()
                .join("jobs")
                .join(format!("{}.tgz", job_ref.name));
            unpack_path(&archive, &dir)?;

            let job_manifest: JobManifest = read_yaml(&dir.join(JOB_MANIFEST))?;
            Ok(Job {
                name: job_ref.name.clone(),
                version: job_ref.version.clone(),
                fingerprint: job_ref.fingerprint.clone(),
                sha1: job_ref.sha1.clone(),
                templates: job_manifest.templates,
                packages: job_manifest.packages,
                extracted_path: dir,
            })
        })
        .collect::<Result<Vec<_>, ReleaseError>>()?;

    let packages = manifest
        .packages
        .iter()
        .map(|package_ref| {
            let dir = extracted.path().join("packages").join(&package_ref.name);
            let archive = extracted
                .path()
                .join("packages")
                .join(format!("{}.tgz", package_ref.name));
            unpack_path(&archive, &dir)?;

            Ok(Package {
                name: package_ref.name.clone(),
                version: package_ref.version.clone(),
                fingerprint: package_ref.fingerprint.clone(),
                sha1: package_ref.sha1.clone(),
                dependencies: package_ref.dependencies.clone(),
                extracted_path: dir,
            })
        })
        .collect::<Result<Vec<_>, ReleaseError>>()?;

    tracing::debug!(
        release = %manifest.name,
        jobs = jobs.len(),
        packages = packages.len(),
        path = %extracted.path().display(),
        "extracted release"
    );

    Ok(Release::new(
        manifest.name,
        manifest.version,
        jobs,
        packages,
        extracted,
    ))
}

/// Job and package names become directory names, so they are checked before
/// any nested archive is unpacked.
fn check_archive_names(manifest: &ReleaseManifest) -> Result<(), ReleaseError> {
    let jobs = manifest.jobs.iter().map(|j| ("job", j.name.as_str()));
    let packages = manifest.packages.iter().map(|p| ("package", p.name.as_str()));
    let problems: Vec<String> = jobs
        .chain(packages)
        .filter(|(_, name)| !name.is_empty() && !is_plain_name(name))
        .map(|(kind, name)| path_name_problem(kind, name))
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        InvalidSnafu { problems }.fail()
    }
}

fn unpack_path(archive: &Path, dest: &Path) -> Result<(), ReleaseError> {
    let file = File::open(archive).context(UnpackSnafu { path: archive })?;
    unpack(file, archive, dest)
}

fn unpack(file: File, archive: &Path, dest: &Path) -> Result<(), ReleaseError> {
    std::fs::create_dir_all(dest).context(UnpackSnafu { path: archive })?;

    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.set_preserve_permissions(true);
    tar.unpack(dest).context(UnpackSnafu { path: archive })
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ReleaseError> {
    let content = std::fs::read_to_string(path).context(ReadManifestSnafu { path })?;
    serde_yaml::from_str(&content).context(ParseManifestSnafu {
        path: PathBuf::from(path),
    })
}
