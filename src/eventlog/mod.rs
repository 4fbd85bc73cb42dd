// ABOUTME: Stage/step event logging for long-running operations.
// ABOUTME: Exports the event model, sink trait, and stage recorder.

mod event;
mod stage;

pub use event::{Event, EventKind, EventSink};
pub use stage::{EventLogger, Stage, StepError};
