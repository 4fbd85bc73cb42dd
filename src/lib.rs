// ABOUTME: Library root for cpi-deploy - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod agent;
pub mod cloud;
pub mod config;
pub mod cpi;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod eventlog;
pub mod manifest;
pub mod output;
pub mod release;
pub mod types;
