// ABOUTME: Release reading and validation errors with SNAFU context.
// ABOUTME: Every variant names the file or archive that failed.

use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReleaseError {
    #[snafu(display("creating temporary extraction directory"))]
    CreateTempDir { source: std::io::Error },

    #[snafu(display("unpacking archive '{}'", path.display()))]
    Unpack {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("reading manifest '{}'", path.display()))]
    ReadManifest {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("parsing manifest '{}'", path.display()))]
    ParseManifest {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("release is invalid: {}", problems.join("; ")))]
    Invalid { problems: Vec<String> },

    #[snafu(display("release extraction task failed"))]
    Task { source: tokio::task::JoinError },
}

impl ReleaseError {
    /// Structural problems found by validation, if this is a validation error.
    pub fn problems(&self) -> &[String] {
        match self {
            ReleaseError::Invalid { problems } => problems,
            _ => &[],
        }
    }
}
