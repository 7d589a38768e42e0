use std::sync::Arc;
use tracing::{debug, warn};

use redgreen_extract::extract_file_blocks;
use redgreen_git::SnapshotStore;
use redgreen_llm::LlmClient;
use redgreen_logging::{LogEvent, Logger, Role};
use redgreen_runner::ProjectRunner;

use crate::prompts::{RolePrompts, NO_REFACTOR_SENTINEL};
use crate::roles::{is_safe_relative, write_workspace_file};
use crate::{CycleError, RefactorerOutcome};

/// The Refactor phase: optional structural cleanup that must leave the
/// suite green. A refactor has no notion of partial correctness, so every
/// failed attempt is discarded in full - the working tree reverts to the
/// last commit before the next try. This is the deliberate opposite of the
/// Implementer's retry-forward policy.
pub struct Refactorer {
    llm: Arc<dyn LlmClient>,
    runner: Arc<dyn ProjectRunner>,
    store: Arc<SnapshotStore>,
    logger: Arc<Logger>,
    rules: String,
    max_attempts: usize,
}

impl Refactorer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        runner: Arc<dyn ProjectRunner>,
        store: Arc<SnapshotStore>,
        logger: Arc<Logger>,
        rules: String,
        max_attempts: usize,
    ) -> Self {
        Self {
            llm,
            runner,
            store,
            logger,
            rules,
            max_attempts,
        }
    }

    pub async fn run(&self) -> Result<RefactorerOutcome, CycleError> {
        let language = self.runner.language().to_string();

        for attempt in 1..=self.max_attempts {
            self.logger.log(&LogEvent::AttemptStarted {
                role: Role::Refactorer,
                attempt,
                max_attempts: self.max_attempts,
            });

            let files = self.runner.all_files()?;
            let request = RolePrompts::refactorer(&self.rules, &language, &files);
            let response = self.llm.complete(&request).await?;

            if response.to_uppercase().contains(NO_REFACTOR_SENTINEL) {
                debug!("Refactorer declined; nothing touched");
                return Ok(RefactorerOutcome::Skipped);
            }

            // Refactoring may touch any file; only workspace escapes are
            // rejected.
            let blocks =
                extract_file_blocks(&response, Some(self.runner.default_source_path()));
            if blocks.is_empty() {
                warn!(attempt, "No usable file blocks in refactoring output");
                self.store.revert_all()?;
                return Ok(RefactorerOutcome::Error {
                    message: "no file content found in refactoring output".to_string(),
                });
            }

            for block in &blocks {
                if !is_safe_relative(&block.path) {
                    self.logger.log(&LogEvent::PathRejected {
                        role: Role::Refactorer,
                        path: block.path.clone(),
                    });
                    continue;
                }
                write_workspace_file(self.runner.work_dir(), &block.path, &block.content)?;
                self.logger.log(&LogEvent::FileWritten {
                    role: Role::Refactorer,
                    path: block.path.clone(),
                });
            }

            let result = self.runner.run_tests().await?;
            self.logger.log(&LogEvent::TestsCompleted {
                role: Role::Refactorer,
                success: result.success(),
                exit_code: result.exit_code,
                duration_secs: result.duration.as_secs_f64(),
            });

            if result.success() {
                self.store.stage_all()?;
                let commit_message = "refactor: tidy code structure".to_string();
                self.store.commit(&commit_message)?;
                self.logger.log(&LogEvent::Committed {
                    role: Role::Refactorer,
                    message: commit_message.clone(),
                });
                return Ok(RefactorerOutcome::Green { commit_message });
            }

            // Discard the attempt in full and retry from the clean baseline.
            self.store.revert_all()?;
            self.logger.log(&LogEvent::Reverted {
                role: Role::Refactorer,
            });
        }

        Ok(RefactorerOutcome::Failed {
            message: format!(
                "could not keep tests green after {} attempts",
                self.max_attempts
            ),
        })
    }
}
