// ABOUTME: Typed errors returned by cloud operations.
// ABOUTME: The kind drives control flow; the message is for humans only.

use std::fmt;

/// Classification of a cloud failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudErrorKind {
    VmNotFound,
    DiskNotFound,
    StemcellNotFound,
    /// Any other error type reported by the CPI.
    Cpi(String),
    /// The CPI could not be invoked or answered with garbage.
    Transport,
}

impl CloudErrorKind {
    /// Map a CPI-reported error type onto a kind.
    pub fn from_cpi_type(error_type: &str) -> Self {
        match error_type {
            "Bosh::Clouds::VMNotFound" => CloudErrorKind::VmNotFound,
            "Bosh::Clouds::DiskNotFound" => CloudErrorKind::DiskNotFound,
            "Bosh::Clouds::StemcellNotFound" => CloudErrorKind::StemcellNotFound,
            other => CloudErrorKind::Cpi(other.to_string()),
        }
    }
}

impl fmt::Display for CloudErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudErrorKind::VmNotFound => f.write_str("VM not found"),
            CloudErrorKind::DiskNotFound => f.write_str("disk not found"),
            CloudErrorKind::StemcellNotFound => f.write_str("stemcell not found"),
            CloudErrorKind::Cpi(t) => write!(f, "CPI error {t}"),
            CloudErrorKind::Transport => f.write_str("CPI transport error"),
        }
    }
}

/// Error from a single cloud call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{method}: {kind}: {message}")]
pub struct CloudError {
    pub method: &'static str,
    pub kind: CloudErrorKind,
    pub message: String,
}

impl CloudError {
    pub fn new(method: &'static str, kind: CloudErrorKind, message: impl Into<String>) -> Self {
        Self {
            method,
            kind,
            message: message.into(),
        }
    }

    pub fn transport(method: &'static str, message: impl Into<String>) -> Self {
        Self::new(method, CloudErrorKind::Transport, message)
    }

    pub fn kind(&self) -> &CloudErrorKind {
        &self.kind
    }
}

/// Errors from turning installed jobs into a cloud handle.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("no installed job provides an executable 'bin/cpi' (searched: {})", .searched.join(", "))]
    NoCpiExecutable { searched: Vec<String> },

    #[error("no jobs were installed")]
    NoJobs,
}
