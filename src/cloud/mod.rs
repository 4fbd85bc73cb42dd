// ABOUTME: Cloud abstraction over an installed CPI.
// ABOUTME: Defines the Cloud and CloudFactory seams plus the external CPI implementation.

mod error;
mod external;

pub use error::{CloudError, CloudErrorKind, FactoryError};
pub use external::{ExternalCloud, ExternalCloudFactory};

use async_trait::async_trait;
use std::sync::Arc;

use crate::cpi::InstalledJob;
use crate::types::{DiskCid, StemcellCid, VmCid};

/// Handle to a running CPI. The only gateway to real infrastructure.
#[async_trait]
pub trait Cloud: Send + Sync {
    /// Start the CPI's own job processes.
    async fn start(&self) -> Result<(), CloudError>;

    /// Stop the CPI's own job processes.
    async fn stop(&self) -> Result<(), CloudError>;

    async fn has_vm(&self, cid: &VmCid) -> Result<bool, CloudError>;

    async fn delete_vm(&self, cid: &VmCid) -> Result<(), CloudError>;

    async fn delete_disk(&self, cid: &DiskCid) -> Result<(), CloudError>;

    async fn delete_stemcell(&self, cid: &StemcellCid) -> Result<(), CloudError>;
}

/// Builds a cloud handle from the jobs of an installed CPI release.
pub trait CloudFactory: Send + Sync {
    /// Validate that `jobs` form an invokable CPI and wrap them.
    fn new_cloud(&self, jobs: &[InstalledJob]) -> Result<Arc<dyn Cloud>, FactoryError>;
}
