use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::{CommandError, CommandResult};

/// Errors from a project runner.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    #[error("project initialization failed: {0}")]
    InitFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Named file areas of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileArea {
    Source,
    Test,
}

/// Ordered mapping from workspace-relative path to full file content.
pub type FileSet = BTreeMap<PathBuf, String>;

/// Supported target languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Rust => write!(f, "rust"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rust" | "rs" => Ok(Language::Rust),
            _ => Err(format!("unsupported language: {}", s)),
        }
    }
}

/// Adapter over one language's build/test toolchain.
///
/// Exactly one implementation exists per supported language. All mutation of
/// the workspace happens through plain file writes by the roles; the runner
/// only initializes the project, executes the test suite, and enumerates
/// files for prompt context.
#[async_trait]
pub trait ProjectRunner: Send + Sync {
    fn language(&self) -> Language;

    /// Workspace root the runner operates in.
    fn work_dir(&self) -> &Path;

    /// Relative path prefix of an area, with trailing slash (`src/`, `tests/`).
    fn area_prefix(&self, area: FileArea) -> &'static str;

    /// Path the extractor falls back to when generated text carries a single
    /// untagged code block.
    fn default_source_path(&self) -> &'static str;

    /// Create an empty project if none exists. Idempotent.
    async fn initialize(&self) -> Result<(), RunnerError>;

    /// Execute the full test suite. A failing suite is an `Ok` result with a
    /// non-zero exit code.
    async fn run_tests(&self) -> Result<CommandResult, RunnerError>;

    /// Enumerate files of one area with their contents.
    fn list_files(&self, area: FileArea) -> Result<FileSet, RunnerError>;

    /// Source and test files merged.
    fn all_files(&self) -> Result<FileSet, RunnerError> {
        let mut files = self.list_files(FileArea::Source)?;
        files.extend(self.list_files(FileArea::Test)?);
        Ok(files)
    }
}
