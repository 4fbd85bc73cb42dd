// ABOUTME: Persisted deployment state: which CIDs belong to the current deployment.
// ABOUTME: Shared by resource managers through a lock-protected handle.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{DiskCid, StemcellCid, VmCid};

/// Everything this tool knows it has created, and which of it is current.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentState {
    /// Current instances, in any order on disk; consumers sort by index.
    #[serde(default)]
    pub instances: Vec<InstanceRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_disk: Option<DiskCid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stemcell: Option<StemcellCid>,

    #[serde(default)]
    pub vms: Vec<VmRecord>,

    #[serde(default)]
    pub disks: Vec<DiskRecord>,

    #[serde(default)]
    pub stemcells: Vec<StemcellRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub index: u32,
    pub vm_cid: VmCid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRecord {
    pub cid: VmCid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskRecord {
    pub cid: DiskCid,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemcellRecord {
    pub cid: StemcellCid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

impl DeploymentState {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn forget_vm(&mut self, cid: &VmCid) {
        self.vms.retain(|r| &r.cid != cid);
        self.instances.retain(|r| &r.vm_cid != cid);
    }

    pub fn forget_disk(&mut self, cid: &DiskCid) {
        self.disks.retain(|r| &r.cid != cid);
        if self.current_disk.as_ref() == Some(cid) {
            self.current_disk = None;
        }
    }

    pub fn forget_stemcell(&mut self, cid: &StemcellCid) {
        self.stemcells.retain(|r| &r.cid != cid);
        if self.current_stemcell.as_ref() == Some(cid) {
            self.current_stemcell = None;
        }
    }
}

/// Shared, mutable view of the state for one run.
#[derive(Debug, Clone)]
pub struct StateHandle {
    path: Option<PathBuf>,
    state: Arc<Mutex<DeploymentState>>,
}

impl StateHandle {
    /// Load the state file at `path`; a missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self> {
        let state = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            DeploymentState::from_json(&content).map_err(|source| Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            DeploymentState::default()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// A handle that is never written to disk.
    pub fn in_memory(state: DeploymentState) -> Self {
        Self {
            path: None,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&DeploymentState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut DeploymentState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn snapshot(&self) -> DeploymentState {
        self.state.lock().clone()
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&*self.state.lock())?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "saved deployment state");
        Ok(())
    }
}
