// ABOUTME: Stage and step recorder for multi-step operations.
// ABOUTME: Distinguishes succeeded, skipped, and failed steps without conflating them.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use super::event::{Event, EventKind, EventSink};
use crate::deploy::DeployError;
use crate::error::Error;

/// Outcome of a step's work other than success.
#[derive(Debug)]
pub enum StepError {
    /// The step had nothing to do. Recorded as skipped, not propagated.
    Skipped(String),
    /// The step failed. Recorded as failed and returned to the caller.
    Failed(Error),
}

impl StepError {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StepError::Skipped(reason.into())
    }
}

impl From<Error> for StepError {
    fn from(err: Error) -> Self {
        StepError::Failed(err)
    }
}

impl From<DeployError> for StepError {
    fn from(err: DeployError) -> Self {
        StepError::Failed(err.into())
    }
}

/// Creates stages that all report to the same sink.
#[derive(Clone)]
pub struct EventLogger {
    sink: Arc<dyn EventSink>,
}

impl EventLogger {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn new_stage(&self, name: impl Into<String>) -> Stage {
        Stage {
            name: name.into(),
            sink: Arc::clone(&self.sink),
            steps: 0,
            started_at: None,
        }
    }
}

impl std::fmt::Debug for EventLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLogger").finish_non_exhaustive()
    }
}

/// A named, ordered sequence of steps.
pub struct Stage {
    name: String,
    sink: Arc<dyn EventSink>,
    steps: usize,
    started_at: Option<Instant>,
}

impl Stage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.emit(EventKind::StageStarted);
    }

    /// Run one step.
    ///
    /// Success and skip both return `Ok(())`. Any other failure is recorded and the
    /// original error is handed back so the caller can abort the stage.
    pub async fn perform_step<F>(&mut self, name: impl Into<String>, work: F) -> Result<(), Error>
    where
        F: Future<Output = Result<(), StepError>>,
    {
        let (step, index) = self.begin_step(name.into());
        let started = Instant::now();

        match work.await {
            Ok(()) => {
                self.emit(EventKind::StepFinished {
                    step,
                    index,
                    duration: started.elapsed(),
                });
                Ok(())
            }
            Err(StepError::Skipped(reason)) => {
                self.emit(EventKind::StepSkipped {
                    step,
                    index,
                    reason,
                });
                Ok(())
            }
            Err(StepError::Failed(err)) => Err(self.fail_step(step, index, err)),
        }
    }

    /// Run a step that produces a value. These steps succeed or fail; they never skip.
    pub async fn perform_step_with<T, F>(
        &mut self,
        name: impl Into<String>,
        work: F,
    ) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        let (step, index) = self.begin_step(name.into());
        let started = Instant::now();

        match work.await {
            Ok(value) => {
                self.emit(EventKind::StepFinished {
                    step,
                    index,
                    duration: started.elapsed(),
                });
                Ok(value)
            }
            Err(err) => Err(self.fail_step(step, index, err)),
        }
    }

    fn begin_step(&mut self, step: String) -> (String, usize) {
        self.steps += 1;
        let index = self.steps;
        self.emit(EventKind::StepStarted {
            step: step.clone(),
            index,
        });
        (step, index)
    }

    fn fail_step(&self, step: String, index: usize, err: Error) -> Error {
        self.emit(EventKind::StepFailed {
            step,
            index,
            error: crate::error::display_chain(&err),
        });
        err
    }

    pub fn finish(&mut self) {
        let duration = self
            .started_at
            .map(|t| t.elapsed())
            .unwrap_or_default();
        self.emit(EventKind::StageFinished { duration });
    }

    fn emit(&self, kind: EventKind) {
        self.sink.handle(&Event {
            time: Utc::now(),
            stage: self.name.clone(),
            kind,
        });
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .finish()
    }
}
