// ABOUTME: Application-wide error types for cpi-deploy.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::cloud::CloudError;
use crate::cpi::InstallError;
use crate::deploy::DeployError;
use crate::manifest::ManifestError;

#[derive(Debug, Error)]
pub enum Error {
    /// `expected` is shown after the error as a usage hint.
    #[error("Invalid usage - {message}")]
    Usage {
        message: String,
        expected: &'static str,
    },

    #[error("No deployment set")]
    NoDeploymentSet,

    #[error("deployment manifest '{}' does not exist", .0.display())]
    DeploymentNotFound(PathBuf),

    #[error("parsing deployment manifest '{}'", path.display())]
    ParseManifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("CPI release '{}' does not exist", .0.display())]
    ReleaseNotFound(PathBuf),

    #[error("extracting CPI release '{}'", path.display())]
    ExtractRelease {
        path: PathBuf,
        #[source]
        source: InstallError,
    },

    #[error("installing CPI deployment")]
    Install(#[source] InstallError),

    #[error("starting CPI")]
    StartCpi(#[source] CloudError),

    #[error("Finding current deployment {what}")]
    FindCurrent {
        what: &'static str,
        #[source]
        source: DeployError,
    },

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parsing '{}'", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Usage line to print after the error, for usage errors.
    pub fn expected_usage(&self) -> Option<&'static str> {
        match self {
            Error::Usage { expected, .. } => Some(*expected),
            _ => None,
        }
    }
}

/// Render an error and its sources on one line, outermost first.
pub fn display_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
