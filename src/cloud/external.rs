// ABOUTME: Cloud implementation backed by an external CPI executable.
// ABOUTME: Each call spawns the CPI and exchanges one JSON request/response over stdio.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Cloud, CloudError, CloudErrorKind, CloudFactory, FactoryError};
use crate::cpi::InstalledJob;
use crate::types::{DiskCid, StemcellCid, VmCid};

const CPI_EXECUTABLE: &str = "bin/cpi";
const CTL_EXECUTABLE: &str = "bin/ctl";

#[derive(Serialize)]
struct CpiRequest<'a> {
    method: &'a str,
    arguments: Vec<Value>,
    context: &'a Value,
}

#[derive(Deserialize)]
struct CpiResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<CpiResponseError>,
    #[serde(default)]
    log: String,
}

#[derive(Deserialize)]
struct CpiResponseError {
    #[serde(rename = "type")]
    error_type: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    ok_to_retry: bool,
}

/// Talks to a CPI binary installed from a release job.
#[derive(Debug)]
pub struct ExternalCloud {
    executable: PathBuf,
    jobs: Vec<InstalledJob>,
    context: Value,
}

impl ExternalCloud {
    /// `context` is sent verbatim with every request.
    pub fn new(executable: PathBuf, jobs: Vec<InstalledJob>, context: Value) -> Self {
        Self {
            executable,
            jobs,
            context,
        }
    }

    async fn call(&self, method: &'static str, arguments: Vec<Value>) -> Result<Value, CloudError> {
        let request = CpiRequest {
            method,
            arguments,
            context: &self.context,
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|e| CloudError::transport(method, format!("encoding request: {e}")))?;

        tracing::debug!(method, executable = %self.executable.display(), "calling CPI");

        let mut child = Command::new(&self.executable)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CloudError::transport(method, format!("spawning CPI: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| CloudError::transport(method, format!("writing request: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CloudError::transport(method, format!("waiting for CPI: {e}")))?;

        if !output.status.success() {
            return Err(CloudError::transport(
                method,
                format!(
                    "CPI exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let response: CpiResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| CloudError::transport(method, format!("decoding response: {e}")))?;

        if !response.log.is_empty() {
            tracing::debug!(method, log = %response.log, "CPI log");
        }

        if let Some(err) = response.error {
            tracing::debug!(method, ok_to_retry = err.ok_to_retry, "CPI returned error");
            return Err(CloudError::new(
                method,
                CloudErrorKind::from_cpi_type(&err.error_type),
                err.message,
            ));
        }

        Ok(response.result)
    }

    async fn run_ctl(&self, method: &'static str, action: &str) -> Result<(), CloudError> {
        for job in &self.jobs {
            let ctl = job.path.join(CTL_EXECUTABLE);
            if !ctl.is_file() {
                continue;
            }

            tracing::info!(job = %job.name, action, "running job control script");
            let output = Command::new(&ctl)
                .arg(action)
                .current_dir(&job.path)
                .output()
                .await
                .map_err(|e| CloudError::transport(method, format!("running {}: {e}", ctl.display())))?;

            if !output.status.success() {
                return Err(CloudError::transport(
                    method,
                    format!(
                        "'{} {action}' for job '{}' exited with {}: {}",
                        CTL_EXECUTABLE,
                        job.name,
                        output.status,
                        String::from_utf8_lossy(&output.stderr).trim()
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Cloud for ExternalCloud {
    async fn start(&self) -> Result<(), CloudError> {
        self.run_ctl("start", "start").await
    }

    async fn stop(&self) -> Result<(), CloudError> {
        self.run_ctl("stop", "stop").await
    }

    async fn has_vm(&self, cid: &VmCid) -> Result<bool, CloudError> {
        let result = self.call("has_vm", vec![json!(cid)]).await?;
        result
            .as_bool()
            .ok_or_else(|| CloudError::transport("has_vm", format!("expected boolean, got {result}")))
    }

    async fn delete_vm(&self, cid: &VmCid) -> Result<(), CloudError> {
        self.call("delete_vm", vec![json!(cid)]).await.map(drop)
    }

    async fn delete_disk(&self, cid: &DiskCid) -> Result<(), CloudError> {
        self.call("delete_disk", vec![json!(cid)]).await.map(drop)
    }

    async fn delete_stemcell(&self, cid: &StemcellCid) -> Result<(), CloudError> {
        self.call("delete_stemcell", vec![json!(cid)]).await.map(drop)
    }
}

/// Finds the CPI executable among installed jobs.
///
/// Requests carry `{"director_uuid": <deployment name>, "properties": <cloud_provider.properties>}`
/// as their context.
#[derive(Debug, Clone)]
pub struct ExternalCloudFactory {
    context: Value,
}

impl ExternalCloudFactory {
    pub fn new(director_id: impl Into<String>, properties: Value) -> Self {
        Self {
            context: json!({
                "director_uuid": director_id.into(),
                "properties": properties,
            }),
        }
    }
}

impl CloudFactory for ExternalCloudFactory {
    fn new_cloud(&self, jobs: &[InstalledJob]) -> Result<Arc<dyn Cloud>, FactoryError> {
        if jobs.is_empty() {
            return Err(FactoryError::NoJobs);
        }

        let executable = jobs
            .iter()
            .map(|job| job.path.join(CPI_EXECUTABLE))
            .find(|path| is_executable(path))
            .ok_or_else(|| FactoryError::NoCpiExecutable {
                searched: jobs.iter().map(|j| j.name.clone()).collect(),
            })?;

        tracing::info!(executable = %executable.display(), "using CPI executable");
        Ok(Arc::new(ExternalCloud::new(
            executable,
            jobs.to_vec(),
            self.context.clone(),
        )))
    }
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
