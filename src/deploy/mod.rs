// ABOUTME: Deployment teardown using the type state pattern.
// ABOUTME: Exports resource managers, state markers, and the Teardown orchestrator.

mod error;
mod instance;
mod manager;
mod state;
mod teardown;

pub use error::DeployError;
pub use instance::{Instance, InstanceManager, PING_DELAY, PING_TIMEOUT};
pub use manager::{
    DiskManager, Manager, Resource, ResourceKind, ResourceManager, SingletonKind,
    StemcellManager,
};
pub use state::{CpiStarted, Done, Idle, Installed, Validated};
pub use teardown::Teardown;
