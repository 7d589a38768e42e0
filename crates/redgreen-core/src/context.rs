use chrono::{DateTime, Utc};
use redgreen_runner::CommandResult;
use serde::{Deserialize, Serialize};

/// Shared context threaded through one full TDD cycle.
///
/// Created empty when the supervisor starts; the red-phase fields are
/// overwritten after each successful Red phase and read by the Implementer.
/// Nothing here outlives the process; durable state is what the snapshot
/// store commits.
#[derive(Debug, Clone, Default)]
pub struct CycleContext {
    /// Outcome of the most recent test run, if any.
    pub last_test_result: Option<CommandResult>,
    /// Path of the test the current cycle is built around.
    pub test_path: Option<String>,
    /// Content of that test file.
    pub test_content: Option<String>,
    /// The red run the Implementer has to turn green.
    pub failing_test: Option<CommandResult>,
}

impl CycleContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a confirmed Red phase.
    pub fn record_red(&mut self, path: String, content: String, result: CommandResult) {
        self.last_test_result = Some(result.clone());
        self.test_path = Some(path);
        self.test_content = Some(content);
        self.failing_test = Some(result);
    }

    /// Diagnostic text of the last test run, for prompt context.
    pub fn last_result_text(&self) -> String {
        match &self.last_test_result {
            Some(result) => result.combined_output(),
            None => "No previous test run.".to_string(),
        }
    }
}

/// Summary of one completed (or aborted) cycle, kept for the run history
/// and the session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle_number: usize,
    /// Tester status label (`red`, `overshot`, `done`, `error`).
    pub tester: String,
    /// Implementer status label, when that phase ran.
    pub implementer: Option<String>,
    /// Refactorer status label, when that phase ran.
    pub refactorer: Option<String>,
    pub timestamp: DateTime<Utc>,
}
