//! Scripted fakes shared by the role and supervisor tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use redgreen_git::SnapshotStore;
use redgreen_llm::{CompletionRequest, LlmClient, LlmError};
use redgreen_logging::{LogFormat, Logger};
use redgreen_runner::{
    CommandResult, FileArea, FileSet, Language, ProjectRunner, RunnerError,
};

/// LLM fake that replays a fixed list of responses.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(LlmError::EmptyResponse)
    }
}

/// Project runner fake: real files on disk, scripted test results.
pub struct FakeRunner {
    work_dir: PathBuf,
    results: Mutex<VecDeque<CommandResult>>,
    test_runs: AtomicUsize,
}

impl FakeRunner {
    pub fn new(work_dir: PathBuf, results: Vec<CommandResult>) -> Arc<Self> {
        Arc::new(Self {
            work_dir,
            results: Mutex::new(results.into()),
            test_runs: AtomicUsize::new(0),
        })
    }

    pub fn test_runs(&self) -> usize {
        self.test_runs.load(Ordering::SeqCst)
    }

    fn collect_rs(&self, dir: &Path, files: &mut FileSet) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.collect_rs(&path, files);
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                let relative = path.strip_prefix(&self.work_dir).unwrap().to_path_buf();
                let content = std::fs::read_to_string(&path).unwrap();
                files.insert(relative, content);
            }
        }
    }
}

#[async_trait]
impl ProjectRunner for FakeRunner {
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
        std::fs::create_dir_all(self.work_dir.join("src"))?;
        Ok(())
    }

    async fn run_tests(&self) -> Result<CommandResult, RunnerError> {
        self.test_runs.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted test results exhausted"))
    }

    fn list_files(&self, area: FileArea) -> Result<FileSet, RunnerError> {
        let mut files = FileSet::new();
        let dir = match area {
            FileArea::Source => self.work_dir.join("src"),
            FileArea::Test => self.work_dir.join("tests"),
        };
        self.collect_rs(&dir, &mut files);
        Ok(files)
    }
}

pub fn passing() -> CommandResult {
    CommandResult {
        command: "cargo test --no-fail-fast".to_string(),
        exit_code: 0,
        stdout: "test result: ok".to_string(),
        stderr: String::new(),
        duration: Duration::from_millis(10),
    }
}

pub fn failing(stderr: &str) -> CommandResult {
    CommandResult {
        command: "cargo test --no-fail-fast".to_string(),
        exit_code: 101,
        stdout: String::new(),
        stderr: stderr.to_string(),
        duration: Duration::from_millis(10),
    }
}

pub fn quiet_logger() -> Arc<Logger> {
    Arc::new(Logger::new(LogFormat::Compact))
}

pub fn init_store(work_dir: &Path) -> Arc<SnapshotStore> {
    let store = SnapshotStore::new(work_dir.to_path_buf());
    store.init().unwrap();
    Arc::new(store)
}

/// Read the message of the commit HEAD points at.
pub fn head_commit_message(work_dir: &Path) -> String {
    let repo = git2::Repository::open(work_dir).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    head.message().unwrap_or_default().to_string()
}

/// Content of a path as committed at HEAD.
pub fn committed_content(work_dir: &Path, rel: &str) -> String {
    let repo = git2::Repository::open(work_dir).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    let tree = head.tree().unwrap();
    let entry = tree.get_path(Path::new(rel)).unwrap();
    let blob = repo.find_blob(entry.id()).unwrap();
    String::from_utf8_lossy(blob.content()).to_string()
}
