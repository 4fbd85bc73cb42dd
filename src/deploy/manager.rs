// ABOUTME: Generic resource manager for disks, stemcells, and VMs.
// ABOUTME: Finds the current deployment's resource and sweeps resources no longer in use.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::cloud::{Cloud, CloudError, CloudErrorKind};
use crate::config::{DeploymentState, StateHandle};
use crate::error::Error;
use crate::eventlog::{Stage, StepError};
use crate::types::{Cid, Disk, Stemcell, Vm};

use super::error::DeployError;

/// Kind-specific knowledge a manager needs: how to delete one and where the state keeps it.
pub trait ResourceKind: Sized + Send + Sync + 'static {
    /// Human label used in step names and errors.
    const LABEL: &'static str;

    /// The cloud error kind meaning "already gone".
    const NOT_FOUND: CloudErrorKind;

    fn delete<'a>(cloud: &'a dyn Cloud, cid: &'a Cid<Self>) -> BoxFuture<'a, Result<(), CloudError>>;

    /// Every resource of this kind the state has recorded.
    fn known(state: &DeploymentState) -> Vec<Cid<Self>>;

    /// Resources that belong to the current deployment.
    fn in_use(state: &DeploymentState) -> Vec<Cid<Self>>;

    fn forget(state: &mut DeploymentState, cid: &Cid<Self>);
}

/// Kinds with at most one current resource per deployment.
pub trait SingletonKind: ResourceKind {
    fn current(state: &DeploymentState) -> Option<Cid<Self>>;
}

impl ResourceKind for Vm {
    const LABEL: &'static str = "VM";
    const NOT_FOUND: CloudErrorKind = CloudErrorKind::VmNotFound;

    fn delete<'a>(cloud: &'a dyn Cloud, cid: &'a Cid<Self>) -> BoxFuture<'a, Result<(), CloudError>> {
        cloud.delete_vm(cid)
    }

    fn known(state: &DeploymentState) -> Vec<Cid<Self>> {
        state.vms.iter().map(|r| r.cid.clone()).collect()
    }

    fn in_use(state: &DeploymentState) -> Vec<Cid<Self>> {
        state.instances.iter().map(|r| r.vm_cid.clone()).collect()
    }

    fn forget(state: &mut DeploymentState, cid: &Cid<Self>) {
        state.forget_vm(cid);
    }
}

impl ResourceKind for Disk {
    const LABEL: &'static str = "disk";
    const NOT_FOUND: CloudErrorKind = CloudErrorKind::DiskNotFound;

    fn delete<'a>(cloud: &'a dyn Cloud, cid: &'a Cid<Self>) -> BoxFuture<'a, Result<(), CloudError>> {
        cloud.delete_disk(cid)
    }

    fn known(state: &DeploymentState) -> Vec<Cid<Self>> {
        state.disks.iter().map(|r| r.cid.clone()).collect()
    }

    fn in_use(state: &DeploymentState) -> Vec<Cid<Self>> {
        state.current_disk.iter().cloned().collect()
    }

    fn forget(state: &mut DeploymentState, cid: &Cid<Self>) {
        state.forget_disk(cid);
    }
}

impl SingletonKind for Disk {
    fn current(state: &DeploymentState) -> Option<Cid<Self>> {
        state.current_disk.clone()
    }
}

impl ResourceKind for Stemcell {
    const LABEL: &'static str = "stemcell";
    const NOT_FOUND: CloudErrorKind = CloudErrorKind::StemcellNotFound;

    fn delete<'a>(cloud: &'a dyn Cloud, cid: &'a Cid<Self>) -> BoxFuture<'a, Result<(), CloudError>> {
        cloud.delete_stemcell(cid)
    }

    fn known(state: &DeploymentState) -> Vec<Cid<Self>> {
        state.stemcells.iter().map(|r| r.cid.clone()).collect()
    }

    fn in_use(state: &DeploymentState) -> Vec<Cid<Self>> {
        state.current_stemcell.iter().cloned().collect()
    }

    fn forget(state: &mut DeploymentState, cid: &Cid<Self>) {
        state.forget_stemcell(cid);
    }
}

impl SingletonKind for Stemcell {
    fn current(state: &DeploymentState) -> Option<Cid<Self>> {
        state.current_stemcell.clone()
    }
}

/// The two operations every resource manager offers.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// What "current" means for this manager: one optional resource, or an ordered list.
    type Current;

    /// Resolve the current deployment's resources from persisted state.
    fn find_current(&self) -> Result<Self::Current, DeployError>;

    /// Delete every known resource that is not current, one step each.
    async fn delete_unused(&self, stage: &mut Stage) -> Result<(), Error>;
}

/// A single cloud resource bound to the cloud that can delete it.
pub struct Resource<K: ResourceKind> {
    cid: Cid<K>,
    cloud: Arc<dyn Cloud>,
    state: StateHandle,
}

impl<K: ResourceKind> Resource<K> {
    pub fn new(cid: Cid<K>, cloud: Arc<dyn Cloud>, state: StateHandle) -> Self {
        Self { cid, cloud, state }
    }

    pub fn cid(&self) -> &Cid<K> {
        &self.cid
    }

    pub(crate) fn cloud(&self) -> &dyn Cloud {
        self.cloud.as_ref()
    }

    /// Delete the resource and drop it from persisted state.
    pub async fn delete(&self) -> Result<(), CloudError> {
        K::delete(self.cloud.as_ref(), &self.cid).await?;
        self.forget();
        Ok(())
    }

    /// `delete` shaped as step work: already gone is a skip, any other cloud error fails.
    pub async fn delete_step(&self) -> Result<(), StepError> {
        match self.delete().await {
            Ok(()) => Ok(()),
            Err(err) if *err.kind() == K::NOT_FOUND => {
                tracing::debug!(cid = %self.cid, kind = K::LABEL, "resource already deleted");
                self.forget();
                Err(StepError::skipped(err.to_string()))
            }
            Err(source) => Err(DeployError::Delete {
                label: K::LABEL,
                cid: self.cid.to_string(),
                source,
            }
            .into()),
        }
    }

    fn forget(&self) {
        self.state.update(|s| K::forget(s, &self.cid));
    }
}

impl<K: ResourceKind> std::fmt::Debug for Resource<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("kind", &K::LABEL)
            .field("cid", &self.cid)
            .finish()
    }
}

/// Manager for one resource kind.
pub struct Manager<K: ResourceKind> {
    cloud: Arc<dyn Cloud>,
    state: StateHandle,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> Manager<K> {
    pub fn new(cloud: Arc<dyn Cloud>, state: StateHandle) -> Self {
        Self {
            cloud,
            state,
            _kind: PhantomData,
        }
    }

    pub(crate) fn resource(&self, cid: Cid<K>) -> Resource<K> {
        Resource::new(cid, Arc::clone(&self.cloud), self.state.clone())
    }

    pub(crate) fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Known resources that the current deployment does not use, in recorded order.
    pub fn find_unused(&self) -> Vec<Resource<K>> {
        let unused: Vec<Cid<K>> = self.state.read(|s| {
            let in_use = K::in_use(s);
            K::known(s)
                .into_iter()
                .filter(|cid| !in_use.contains(cid))
                .collect()
        });
        unused.into_iter().map(|cid| self.resource(cid)).collect()
    }

    pub async fn delete_unused(&self, stage: &mut Stage) -> Result<(), Error> {
        for resource in self.find_unused() {
            let name = format!("Deleting unused {} '{}'", K::LABEL, resource.cid());
            stage.perform_step(name, resource.delete_step()).await?;
        }
        Ok(())
    }

    /// Check that `cid` is one of the recorded resources of this kind.
    pub(crate) fn ensure_known(&self, cid: &Cid<K>) -> Result<(), DeployError> {
        if self.state.read(|s| K::known(s).contains(cid)) {
            Ok(())
        } else {
            Err(DeployError::StateInconsistent {
                kind: K::LABEL,
                cid: cid.to_string(),
            })
        }
    }
}

#[async_trait]
impl<K: SingletonKind> ResourceManager for Manager<K> {
    type Current = Option<Resource<K>>;

    fn find_current(&self) -> Result<Self::Current, DeployError> {
        let Some(cid) = self.state.read(K::current) else {
            return Ok(None);
        };
        self.ensure_known(&cid)?;
        Ok(Some(self.resource(cid)))
    }

    async fn delete_unused(&self, stage: &mut Stage) -> Result<(), Error> {
        Manager::delete_unused(self, stage).await
    }
}

pub type DiskManager = Manager<Disk>;
pub type StemcellManager = Manager<Stemcell>;
