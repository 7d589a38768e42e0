use std::sync::Arc;
use tracing::{debug, warn};

use redgreen_extract::extract_file_blocks;
use redgreen_git::SnapshotStore;
use redgreen_llm::LlmClient;
use redgreen_logging::{LogEvent, Logger, Role};
use redgreen_runner::{FileArea, ProjectRunner};

use crate::prompts::RolePrompts;
use crate::roles::{is_safe_relative, write_workspace_file};
use crate::{CycleContext, CycleError, ImplementerOutcome};

/// The Green phase: the minimal production-code change that makes the
/// failing test pass, retried forward with fresh diagnostics up to the
/// attempt budget. Failed attempts are never reverted; the next attempt
/// builds on whatever is on disk plus the latest diagnostics.
pub struct Implementer {
    llm: Arc<dyn LlmClient>,
    runner: Arc<dyn ProjectRunner>,
    store: Arc<SnapshotStore>,
    logger: Arc<Logger>,
    rules: String,
    max_attempts: usize,
}

impl Implementer {
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

    pub async fn run(&self, context: &CycleContext) -> Result<ImplementerOutcome, CycleError> {
        let (Some(test_path), Some(mut failing)) =
            (context.test_path.clone(), context.failing_test.clone())
        else {
            return Ok(ImplementerOutcome::Error {
                message: "no failing test recorded for this cycle".to_string(),
            });
        };

        let language = self.runner.language().to_string();
        let source_prefix = self.runner.area_prefix(FileArea::Source);

        for attempt in 1..=self.max_attempts {
            self.logger.log(&LogEvent::AttemptStarted {
                role: Role::Implementer,
                attempt,
                max_attempts: self.max_attempts,
            });

            let sources = self.runner.list_files(FileArea::Source)?;
            let request = RolePrompts::implementer(
                &self.rules,
                &language,
                &sources,
                &failing.combined_output(),
            );
            let response = self.llm.complete(&request).await?;

            let blocks =
                extract_file_blocks(&response, Some(self.runner.default_source_path()));

            // Hard content boundary: this role must never rewrite tests.
            let mut written = Vec::new();
            for block in blocks {
                if !block.path.starts_with(source_prefix) || !is_safe_relative(&block.path) {
                    self.logger.log(&LogEvent::PathRejected {
                        role: Role::Implementer,
                        path: block.path,
                    });
                    continue;
                }
                write_workspace_file(self.runner.work_dir(), &block.path, &block.content)?;
                self.logger.log(&LogEvent::FileWritten {
                    role: Role::Implementer,
                    path: block.path.clone(),
                });
                written.push(block.path);
            }

            if written.is_empty() {
                warn!(attempt, "No usable source files in generated output");
                if attempt == self.max_attempts {
                    return Ok(ImplementerOutcome::Failed {
                        message: format!(
                            "no usable source files generated within {} attempts",
                            self.max_attempts
                        ),
                    });
                }
                // Same inputs next attempt; only an actual test run
                // refreshes the feedback.
                continue;
            }

            let result = self.runner.run_tests().await?;
            self.logger.log(&LogEvent::TestsCompleted {
                role: Role::Implementer,
                success: result.success(),
                exit_code: result.exit_code,
                duration_secs: result.duration.as_secs_f64(),
            });

            if result.success() {
                self.store.stage_all()?;
                let commit_message = format!("feat: make {} pass", test_path);
                self.store.commit(&commit_message)?;
                self.logger.log(&LogEvent::Committed {
                    role: Role::Implementer,
                    message: commit_message.clone(),
                });
                return Ok(ImplementerOutcome::Green { commit_message });
            }

            debug!(attempt, exit_code = result.exit_code, "Suite still red; feeding diagnostics back");
            failing = result;
        }

        Ok(ImplementerOutcome::Failed {
            message: format!("tests still failing after {} attempts", self.max_attempts),
        })
    }
}
