// ABOUTME: Command module aggregator for the cpi-deploy CLI.
// ABOUTME: Re-exports the deployment and delete command handlers.

mod delete;
mod deployment;

pub use delete::delete;
pub use deployment::deployment;
