//! # redgreen-runner
//!
//! Command execution and language toolchain adapters for the redgreen
//! TDD loop.
//!
//! This crate owns the two lowest layers of the system:
//! - running an external command with a timeout and capturing its output
//!   ([`run_command`] / [`CommandResult`]), and
//! - the [`ProjectRunner`] trait that adapts a language's build/test tool
//!   (one implementation per language; [`CargoRunner`] for Rust).
//!
//! A test run that fails, or times out, is a normal [`CommandResult`];
//! only spawn/IO problems surface as errors.

mod cargo;
mod shell;
mod traits;

pub use cargo::CargoRunner;
pub use shell::{run_command, CommandError, CommandResult, TIMEOUT_EXIT_CODE};
pub use traits::{FileArea, FileSet, Language, ProjectRunner, RunnerError};

/// Create a project runner for a target language.
pub fn create_runner(language: Language, work_dir: std::path::PathBuf) -> Box<dyn ProjectRunner> {
    match language {
        Language::Rust => Box::new(CargoRunner::new(work_dir)),
    }
}
