use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::shell::run_command;
use crate::traits::{FileArea, FileSet, Language, ProjectRunner, RunnerError};
use crate::CommandResult;

const INIT_TIMEOUT: Duration = Duration::from_secs(60);
const TEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Project runner for Rust workspaces driven by Cargo.
pub struct CargoRunner {
    work_dir: PathBuf,
}

impl CargoRunner {
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    fn area_dir(&self, area: FileArea) -> PathBuf {
        match area {
            FileArea::Source => self.work_dir.join("src"),
            FileArea::Test => self.work_dir.join("tests"),
        }
    }
}

#[async_trait]
impl ProjectRunner for CargoRunner {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn area_prefix(&self, area: FileArea) -> &'static str {
        match area {
            FileArea::Source => "src/",
            FileArea::Test => "tests/",
        }
    }

    fn default_source_path(&self) -> &'static str {
        "src/lib.rs"
    }

    async fn initialize(&self) -> Result<(), RunnerError> {
        if self.work_dir.join("Cargo.toml").exists() {
            debug!(work_dir = %self.work_dir.display(), "Cargo project already initialized");
            return Ok(());
        }

        info!(work_dir = %self.work_dir.display(), "Initializing new Cargo library project");
        let result = run_command("cargo", &["init", "--lib"], &self.work_dir, INIT_TIMEOUT).await?;
        if !result.success() {
            return Err(RunnerError::InitFailed(result.stderr));
        }
        Ok(())
    }

    async fn run_tests(&self) -> Result<CommandResult, RunnerError> {
        // --no-fail-fast so diagnostics cover the whole suite
        let result = run_command(
            "cargo",
            &["test", "--no-fail-fast"],
            &self.work_dir,
            TEST_TIMEOUT,
        )
        .await?;
        Ok(result)
    }

    fn list_files(&self, area: FileArea) -> Result<FileSet, RunnerError> {
        let mut files = FileSet::new();
        let dir = self.area_dir(area);
        if !dir.exists() {
            return Ok(files);
        }

        for entry in WalkDir::new(&dir).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("rs") {
                continue;
            }
            let relative = path
                .strip_prefix(&self.work_dir)
                .unwrap_or(path)
                .to_path_buf();
            let content = std::fs::read_to_string(path)?;
            files.insert(relative, content);
        }

        Ok(files)
    }
}
