// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes; renders stage events.

use serde::Serialize;
use std::time::Instant;

use crate::error::{Error, display_chain};
use crate::eventlog::{Event, EventKind, EventSink};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only failures and the final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => self.print_json("success", message, false),
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => self.print_json("warning", message, true),
        }
    }

    /// Print a fatal error with its causes, then the usage hint if it has one.
    pub fn error(&self, err: &Error) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("{}", error_report(err)),
            OutputMode::Json => self.print_json("error", &display_chain(err), true),
        }
    }

    fn print_json(&self, event: &str, message: &str, stderr: bool) {
        let event = JsonEvent {
            event,
            message,
            duration_secs: self.start_time.map(|_| self.elapsed_secs()),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            if stderr {
                eprintln!("{json}");
            } else {
                println!("{json}");
            }
        }
    }
}

impl EventSink for Output {
    fn handle(&self, event: &Event) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(event) {
                    println!("{json}");
                }
            }
            OutputMode::Quiet => {
                if let EventKind::StepFailed { step, error, .. } = &event.kind {
                    eprintln!("{} > {step}... failed: {error}", event.stage);
                }
            }
            OutputMode::Normal => {
                if let Some(line) = render(event) {
                    println!("{line}");
                }
            }
        }
    }
}

/// Human-readable line for an event, if it deserves one.
fn render(event: &Event) -> Option<String> {
    let stage = &event.stage;
    match &event.kind {
        EventKind::StageStarted => Some(format!("Started {stage}")),
        EventKind::StepStarted { .. } => None,
        EventKind::StepFinished { step, duration, .. } => Some(format!(
            "  {stage} > {step}... done ({:.1}s)",
            duration.as_secs_f64()
        )),
        EventKind::StepSkipped { step, reason, .. } => {
            Some(format!("  {stage} > {step}... skipped ({reason})"))
        }
        EventKind::StepFailed { step, error, .. } => {
            Some(format!("  {stage} > {step}... failed ({error})"))
        }
        EventKind::StageFinished { duration } => Some(format!(
            "Done {stage} ({:.1}s)",
            duration.as_secs_f64()
        )),
    }
}

fn error_report(err: &Error) -> String {
    let mut lines = vec![format!("Error: {err}")];
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        lines.push(format!("  caused by: {cause}"));
        source = cause.source();
    }
    if let Some(usage) = err.expected_usage() {
        lines.push(usage.to_string());
    }
    lines.join("\n")
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn event(kind: EventKind) -> Event {
        Event {
            time: Utc::now(),
            stage: "deleting deployment".to_string(),
            kind,
        }
    }

    #[test]
    fn skipped_step_shows_reason() {
        let line = render(&event(EventKind::StepSkipped {
            step: "Deleting disk 'disk-1'".to_string(),
            index: 2,
            reason: "disk not found".to_string(),
        }));
        assert_eq!(
            line.as_deref(),
            Some("  deleting deployment > Deleting disk 'disk-1'... skipped (disk not found)")
        );
    }

    #[test]
    fn step_start_is_silent() {
        let line = render(&event(EventKind::StepStarted {
            step: "x".to_string(),
            index: 1,
        }));
        assert!(line.is_none());
    }

    #[test]
    fn usage_hint_follows_the_error() {
        let err = Error::Usage {
            message: "delete command requires exactly 1 argument".to_string(),
            expected: "Expected usage: cpi-deploy delete <cpi-release-tarball>",
        };
        assert_eq!(
            error_report(&err),
            "Error: Invalid usage - delete command requires exactly 1 argument\n\
             Expected usage: cpi-deploy delete <cpi-release-tarball>"
        );
    }

    #[test]
    fn causes_are_listed_under_the_error() {
        let err = Error::ConfigParse {
            path: "/tmp/config.json".into(),
            source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        };
        let report = error_report(&err);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Error: parsing '/tmp/config.json'");
        assert!(lines[1].starts_with("  caused by: EOF"));
    }

    #[test]
    fn stage_finish_reports_duration() {
        let line = render(&event(EventKind::StageFinished {
            duration: Duration::from_millis(1500),
        }));
        assert_eq!(line.as_deref(), Some("Done deleting deployment (1.5s)"));
    }
}
