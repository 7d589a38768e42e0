use redgreen_runner::CommandResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::CycleRecord;

/// Result of one Tester invocation (the Red phase).
#[derive(Debug, Clone)]
pub enum TesterOutcome {
    /// A new failing test exists on disk and is staged.
    Red {
        path: String,
        content: String,
        result: CommandResult,
    },
    /// The generated test passed unexpectedly; nothing was staged.
    Overshot {
        path: String,
        content: String,
        result: CommandResult,
    },
    /// The Tester judged the kata complete; no new test was produced.
    Done,
    /// Unusable generation (no file, or a path outside the test area).
    Error { message: String },
}

impl TesterOutcome {
    pub fn status_label(&self) -> &'static str {
        match self {
            TesterOutcome::Red { .. } => "red",
            TesterOutcome::Overshot { .. } => "overshot",
            TesterOutcome::Done => "done",
            TesterOutcome::Error { .. } => "error",
        }
    }
}

/// Result of one Implementer invocation (the Green phase).
#[derive(Debug, Clone)]
pub enum ImplementerOutcome {
    /// Tests pass; the change is committed.
    Green { commit_message: String },
    /// Attempt budget exhausted without a green suite.
    Failed { message: String },
    /// No usable generation at all.
    Error { message: String },
}

impl ImplementerOutcome {
    pub fn status_label(&self) -> &'static str {
        match self {
            ImplementerOutcome::Green { .. } => "green",
            ImplementerOutcome::Failed { .. } => "failed",
            ImplementerOutcome::Error { .. } => "error",
        }
    }
}

/// Result of one Refactorer invocation (the Refactor phase).
#[derive(Debug, Clone)]
pub enum RefactorerOutcome {
    /// Refactoring kept the suite green and is committed.
    Green { commit_message: String },
    /// The model declined to refactor; nothing was touched.
    Skipped,
    /// Attempt budget exhausted; the tree sits at the last good commit.
    Failed { message: String },
    /// Unusable generation; the tree was reverted.
    Error { message: String },
}

impl RefactorerOutcome {
    pub fn status_label(&self) -> &'static str {
        match self {
            RefactorerOutcome::Green { .. } => "green",
            RefactorerOutcome::Skipped => "skipped",
            RefactorerOutcome::Failed { .. } => "failed",
            RefactorerOutcome::Error { .. } => "error",
        }
    }
}

/// What one cycle tells the supervisor loop to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleDisposition {
    Continue,
    StopClean,
    StopError(String),
}

/// The final outcome of a whole run.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The cycle budget was used up; the workspace ends green.
    Completed {
        cycles: usize,
        #[serde(skip)]
        history: Vec<CycleRecord>,
        total_duration_secs: f64,
    },
    /// The Tester declared the kata complete before the budget ran out.
    KataComplete {
        cycles: usize,
        #[serde(skip)]
        history: Vec<CycleRecord>,
        total_duration_secs: f64,
    },
    /// A role failed unrecoverably.
    Failed {
        cycles: usize,
        error: String,
        #[serde(skip)]
        history: Vec<CycleRecord>,
        total_duration_secs: f64,
    },
    /// Ctrl-C between cycles.
    Interrupted {
        cycles: usize,
        #[serde(skip)]
        history: Vec<CycleRecord>,
        total_duration_secs: f64,
    },
}

impl RunOutcome {
    pub fn completed(cycles: usize, history: Vec<CycleRecord>, duration: Duration) -> Self {
        Self::Completed {
            cycles,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn kata_complete(cycles: usize, history: Vec<CycleRecord>, duration: Duration) -> Self {
        Self::KataComplete {
            cycles,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn failed(
        cycles: usize,
        error: String,
        history: Vec<CycleRecord>,
        duration: Duration,
    ) -> Self {
        Self::Failed {
            cycles,
            error,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(cycles: usize, history: Vec<CycleRecord>, duration: Duration) -> Self {
        Self::Interrupted {
            cycles,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn cycles(&self) -> usize {
        match self {
            Self::Completed { cycles, .. } => *cycles,
            Self::KataComplete { cycles, .. } => *cycles,
            Self::Failed { cycles, .. } => *cycles,
            Self::Interrupted { cycles, .. } => *cycles,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::KataComplete { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::KataComplete { .. } => "kata_complete",
            Self::Failed { .. } => "failed",
            Self::Interrupted { .. } => "interrupted",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } | Self::KataComplete { .. } => 0,
            Self::Failed { .. } => 2,
            Self::Interrupted { .. } => 130,
        }
    }
}
