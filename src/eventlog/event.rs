// ABOUTME: Structured events emitted while a stage runs its steps.
// ABOUTME: Sinks receive every transition; they hold no business logic.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// One observable transition of a stage or one of its steps.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub time: DateTime<Utc>,
    pub stage: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    StageStarted,
    StepStarted {
        step: String,
        index: usize,
    },
    StepFinished {
        step: String,
        index: usize,
        #[serde(with = "humantime_serde")]
        duration: Duration,
    },
    StepSkipped {
        step: String,
        index: usize,
        reason: String,
    },
    StepFailed {
        step: String,
        index: usize,
        error: String,
    },
    StageFinished {
        #[serde(with = "humantime_serde")]
        duration: Duration,
    },
}

/// Receives events from stages. Implementations render or record them.
pub trait EventSink: Send + Sync {
    fn handle(&self, event: &Event);
}
