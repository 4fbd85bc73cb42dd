// ABOUTME: Diagnostics accumulator for non-fatal warnings during a teardown.
// ABOUTME: Collects warnings that shouldn't fail a run but should be shown to users.

/// Collects non-fatal warnings during teardown operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// The CPI's jobs did not stop cleanly.
    pub fn cpi_stop(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::CpiStop,
            message: message.into(),
        }
    }

    /// The extracted release directory could not be removed.
    pub fn release_cleanup(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ReleaseCleanup,
            message: message.into(),
        }
    }

    pub fn state_save(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::StateSave,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during a teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Stopping the CPI jobs failed (they may still be running).
    CpiStop,
    /// Removing the temporary release directory failed.
    ReleaseCleanup,
    /// Writing the deployment state file failed.
    StateSave,
}
