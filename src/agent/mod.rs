// ABOUTME: Agent client used to ping and quiesce an instance before deletion.
// ABOUTME: Defines the AgentClient seam and a bounded readiness wait.

mod http;

pub use http::{HttpAgentClient, HttpAgentClientFactory};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Errors talking to an instance agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("invalid mbus URL '{url}': {reason}")]
    InvalidMbus { url: String, reason: String },

    #[error("connecting to agent: {0}")]
    Connect(#[source] std::io::Error),

    #[error("agent request failed: {0}")]
    Request(String),

    #[error("agent responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decoding agent response")]
    Decode(#[source] serde_json::Error),

    #[error("agent returned exception: {0}")]
    Exception(String),

    #[error("agent did not respond within {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Liveness check. Returns the agent's reply on success.
    async fn ping(&self) -> Result<String, AgentError>;

    /// Ask the agent to stop the jobs it supervises.
    async fn stop(&self) -> Result<(), AgentError>;
}

pub trait AgentClientFactory: Send + Sync {
    fn new_client(&self, mbus: &str) -> Result<Arc<dyn AgentClient>, AgentError>;
}

/// Ping the agent until it answers.
///
/// Makes at most `timeout / delay` attempts, `delay` apart, and never waits longer than
/// `timeout` in total. Individual ping failures are not reported.
pub async fn wait_until_ready(
    agent: &dyn AgentClient,
    timeout: Duration,
    delay: Duration,
) -> Result<(), AgentError> {
    let max_attempts = max_ping_attempts(timeout, delay);

    let pings = async {
        for attempt in 1..=max_attempts {
            match agent.ping().await {
                Ok(_) => {
                    tracing::debug!(attempt, "agent responded to ping");
                    return true;
                }
                Err(e) => tracing::debug!(attempt, error = %e, "agent ping failed"),
            }
            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }
        false
    };

    match tokio::time::timeout(timeout, pings).await {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(AgentError::Timeout(timeout)),
    }
}

/// Number of ping attempts that fit in `timeout` at one attempt per `delay`.
pub fn max_ping_attempts(timeout: Duration, delay: Duration) -> u32 {
    if delay.is_zero() {
        return 1;
    }
    let attempts = timeout.as_millis() / delay.as_millis().max(1);
    u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
}
