use thiserror::Error;

/// Hard failures that abort the operation in progress.
///
/// Domain-level failures (a parse miss, a boundary violation, a red test
/// suite) travel through the role outcome enums instead; only the external
/// collaborators failing outright end up here.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("generation backend error: {0}")]
    Llm(#[from] redgreen_llm::LlmError),

    #[error("snapshot store error: {0}")]
    Git(#[from] redgreen_git::GitError),

    #[error("project runner error: {0}")]
    Runner(#[from] redgreen_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
