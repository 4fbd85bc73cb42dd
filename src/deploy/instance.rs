// ABOUTME: Instances of the current deployment and their ping-gated deletion.
// ABOUTME: The agent is given a bounded chance to stop jobs before the VM is deleted.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{self, AgentClient};
use crate::cloud::Cloud;
use crate::config::StateHandle;
use crate::error::Error;
use crate::eventlog::{Stage, StepError};
use crate::types::{Vm, VmCid};

use super::error::DeployError;
use super::manager::{Manager, Resource, ResourceManager};

/// How long deletion waits for an agent before proceeding without it.
pub const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between agent pings.
pub const PING_DELAY: Duration = Duration::from_millis(500);

/// One instance of the current deployment.
pub struct Instance {
    index: u32,
    vm: Resource<Vm>,
    agent: Arc<dyn AgentClient>,
}

impl Instance {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn vm_cid(&self) -> &VmCid {
        self.vm.cid()
    }

    /// Delete the instance's VM, giving its agent a chance to stop jobs first.
    ///
    /// An unreachable agent never blocks deletion; only a failed VM lookup or a delete
    /// error other than "not found" aborts.
    pub async fn delete(
        &self,
        timeout: Duration,
        delay: Duration,
        stage: &mut Stage,
    ) -> Result<(), Error> {
        let cid = self.vm.cid();
        let exists = self
            .vm
            .cloud()
            .has_vm(cid)
            .await
            .map_err(|source| DeployError::VmLookup {
                cid: cid.to_string(),
                source,
            })?;

        if exists {
            let mut agent_ready = false;
            stage
                .perform_step(format!("Waiting for the agent on VM '{cid}'"), async {
                    agent::wait_until_ready(self.agent.as_ref(), timeout, delay)
                        .await
                        .map_err(|e| StepError::skipped(e.to_string()))?;
                    agent_ready = true;
                    Ok::<(), StepError>(())
                })
                .await?;

            if agent_ready {
                stage
                    .perform_step(format!("Stopping jobs on instance '{cid}'"), async {
                        self.agent
                            .stop()
                            .await
                            .map_err(|e| StepError::skipped(e.to_string()))
                    })
                    .await?;
            }
        } else {
            tracing::debug!(%cid, "VM is already gone, skipping agent handshake");
        }

        stage
            .perform_step(format!("Deleting VM '{cid}'"), self.vm.delete_step())
            .await
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("index", &self.index)
            .field("vm_cid", self.vm.cid())
            .finish_non_exhaustive()
    }
}

/// Finds and deletes the current deployment's instances.
pub struct InstanceManager {
    vms: Manager<Vm>,
    agent: Arc<dyn AgentClient>,
}

impl InstanceManager {
    pub fn new(cloud: Arc<dyn Cloud>, state: StateHandle, agent: Arc<dyn AgentClient>) -> Self {
        Self {
            vms: Manager::new(cloud, state),
            agent,
        }
    }
}

#[async_trait]
impl ResourceManager for InstanceManager {
    type Current = Vec<Instance>;

    /// Current instances ordered by index.
    fn find_current(&self) -> Result<Self::Current, DeployError> {
        let mut records = self.vms.state().read(|s| s.instances.clone());
        records.sort_by_key(|r| r.index);

        records
            .into_iter()
            .map(|record| {
                self.vms.ensure_known(&record.vm_cid)?;
                Ok(Instance {
                    index: record.index,
                    vm: self.vms.resource(record.vm_cid),
                    agent: Arc::clone(&self.agent),
                })
            })
            .collect()
    }

    async fn delete_unused(&self, stage: &mut Stage) -> Result<(), Error> {
        self.vms.delete_unused(stage).await
    }
}
