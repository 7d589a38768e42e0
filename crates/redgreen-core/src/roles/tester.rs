use std::sync::Arc;
use tracing::{debug, warn};

use redgreen_extract::extract_file_blocks;
use redgreen_git::SnapshotStore;
use redgreen_llm::LlmClient;
use redgreen_logging::{LogEvent, Logger, Role};
use redgreen_runner::{FileArea, ProjectRunner};

use crate::prompts::{RolePrompts, KATA_COMPLETE_SENTINEL};
use crate::roles::{crate_name, is_safe_relative, write_workspace_file};
use crate::{CycleContext, CycleError, TesterOutcome};

/// The Red phase: produce exactly one new failing test.
///
/// A single generation per invocation: when it goes wrong the cycle budget,
/// not this role, decides whether to try again.
pub struct Tester {
    llm: Arc<dyn LlmClient>,
    runner: Arc<dyn ProjectRunner>,
    store: Arc<SnapshotStore>,
    logger: Arc<Logger>,
    rules: String,
}

impl Tester {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        runner: Arc<dyn ProjectRunner>,
        store: Arc<SnapshotStore>,
        logger: Arc<Logger>,
        rules: String,
    ) -> Self {
        Self {
            llm,
            runner,
            store,
            logger,
            rules,
        }
    }

    pub async fn run(&self, context: &CycleContext) -> Result<TesterOutcome, CycleError> {
        let language = self.runner.language().to_string();
        let name = crate_name(self.runner.work_dir());
        let files = self.runner.all_files()?;

        let request = RolePrompts::tester(
            &self.rules,
            &name,
            &language,
            &files,
            &context.last_result_text(),
        );
        let response = self.llm.complete(&request).await?;

        if response.contains(KATA_COMPLETE_SENTINEL) {
            debug!("Tester signalled kata completion");
            return Ok(TesterOutcome::Done);
        }

        // The extractor may find several blocks; the contract wants exactly
        // one new test, so the first pair wins. No default path: a pathless
        // block cannot satisfy the test-area rule anyway.
        let Some(block) = extract_file_blocks(&response, None).into_iter().next() else {
            warn!(response_len = response.len(), "Tester produced no usable file block");
            return Ok(TesterOutcome::Error {
                message: "no test file found in generated output".to_string(),
            });
        };

        let test_prefix = self.runner.area_prefix(FileArea::Test);
        if !block.path.starts_with(test_prefix) || !is_safe_relative(&block.path) {
            self.logger.log(&LogEvent::PathRejected {
                role: Role::Tester,
                path: block.path.clone(),
            });
            return Ok(TesterOutcome::Error {
                message: format!(
                    "proposed test path '{}' is outside {}",
                    block.path, test_prefix
                ),
            });
        }

        write_workspace_file(self.runner.work_dir(), &block.path, &block.content)?;
        self.logger.log(&LogEvent::FileWritten {
            role: Role::Tester,
            path: block.path.clone(),
        });

        let result = self.runner.run_tests().await?;
        self.logger.log(&LogEvent::TestsCompleted {
            role: Role::Tester,
            success: result.success(),
            exit_code: result.exit_code,
            duration_secs: result.duration.as_secs_f64(),
        });

        if result.success() {
            // The new test passed against current code: the previous cycle
            // overshot. Leave the file unstaged for the supervisor to judge.
            self.logger.log(&LogEvent::Overshot {
                path: block.path.clone(),
            });
            return Ok(TesterOutcome::Overshot {
                path: block.path,
                content: block.content,
                result,
            });
        }

        self.store.stage(&[block.path.as_str()])?;
        self.logger.log(&LogEvent::RedConfirmed {
            path: block.path.clone(),
        });

        Ok(TesterOutcome::Red {
            path: block.path,
            content: block.content,
            result,
        })
    }
}
