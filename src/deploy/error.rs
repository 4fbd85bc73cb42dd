// ABOUTME: Error types for tearing down a deployment.
// ABOUTME: Covers inconsistent persisted state, cloud deletion, and agent setup failures.

use crate::agent::AgentError;
use crate::cloud::CloudError;

/// Errors that can occur while finding or deleting deployment resources.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A current-deployment pointer names a resource the state does not know.
    #[error("deployment state is inconsistent: current {kind} '{cid}' is not a known {kind}")]
    StateInconsistent { kind: &'static str, cid: String },

    /// The cloud refused to delete a resource.
    #[error("deleting {label} '{cid}'")]
    Delete {
        label: &'static str,
        cid: String,
        #[source]
        source: CloudError,
    },

    /// The cloud could not say whether a VM exists.
    #[error("checking whether VM '{cid}' exists")]
    VmLookup {
        cid: String,
        #[source]
        source: CloudError,
    },

    #[error("creating agent client")]
    AgentClient(#[source] AgentError),
}
