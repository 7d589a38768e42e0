use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use redgreen_git::SnapshotStore;
use redgreen_logging::{LogEvent, Logger, Role, SessionWriter};
use redgreen_runner::ProjectRunner;

use crate::outcome::CycleDisposition;
use crate::roles::{Implementer, Refactorer, Tester};
use crate::{
    CycleContext, CycleError, CycleRecord, ImplementerOutcome, RefactorerOutcome, RunOutcome,
    TesterOutcome,
};

enum EndState {
    Completed,
    KataComplete,
    Failed(String),
    Interrupted,
}

/// Sequences Red → Green → Refactor cycles.
///
/// Invariant: whenever the Implementer or Refactorer reports green, the
/// committed state of the workspace passes the full suite; the supervisor
/// never advances a phase on an unverified change.
pub struct Supervisor {
    tester: Tester,
    implementer: Implementer,
    refactorer: Refactorer,
    runner: Arc<dyn ProjectRunner>,
    store: Arc<SnapshotStore>,
    logger: Arc<Logger>,
    session: Option<SessionWriter>,
    max_cycles: usize,
    interrupted: Arc<AtomicBool>,
    context: CycleContext,
    history: Vec<CycleRecord>,
}

impl Supervisor {
    pub fn new(
        tester: Tester,
        implementer: Implementer,
        refactorer: Refactorer,
        runner: Arc<dyn ProjectRunner>,
        store: Arc<SnapshotStore>,
        logger: Arc<Logger>,
        max_cycles: usize,
    ) -> Self {
        Self {
            tester,
            implementer,
            refactorer,
            runner,
            store,
            logger,
            session: None,
            max_cycles,
            interrupted: Arc::new(AtomicBool::new(false)),
            context: CycleContext::new(),
            history: Vec::new(),
        }
    }

    /// Attach a session transcript writer.
    pub fn with_session(mut self, session: SessionWriter) -> Self {
        self.session = Some(session);
        self
    }

    /// Handle for signalling a stop between cycles (Ctrl-C).
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Run the full TDD loop until a stop condition or the cycle budget.
    pub async fn run(mut self) -> RunOutcome {
        let started = Instant::now();

        self.logger.log(&LogEvent::RunStarted {
            work_dir: self.runner.work_dir().to_path_buf(),
            language: self.runner.language().to_string(),
            max_cycles: self.max_cycles,
        });

        if let Err(e) = self.setup().await {
            let outcome = RunOutcome::failed(
                0,
                format!("setup failed: {}", e),
                Vec::new(),
                started.elapsed(),
            );
            self.write_session_end(&outcome, started);
            return outcome;
        }

        let mut cycles_run = 0;
        let end = loop {
            if self.interrupted.load(Ordering::SeqCst) {
                info!("Interrupted; stopping before the next cycle");
                break EndState::Interrupted;
            }
            if cycles_run >= self.max_cycles {
                self.logger.log(&LogEvent::MaxCyclesReached { cycles: cycles_run });
                break EndState::Completed;
            }

            let cycle_number = cycles_run + 1;
            self.logger.log(&LogEvent::CycleStarted {
                cycle: cycle_number,
                max_cycles: self.max_cycles,
            });

            match self.run_cycle(cycle_number).await {
                Ok(CycleDisposition::Continue) => {
                    cycles_run += 1;
                    self.logger.log(&LogEvent::CycleCompleted {
                        cycle: cycle_number,
                    });
                }
                Ok(CycleDisposition::StopClean) => {
                    self.logger.log(&LogEvent::KataComplete { cycles: cycles_run });
                    break EndState::KataComplete;
                }
                Ok(CycleDisposition::StopError(error)) => break EndState::Failed(error),
                Err(e) => break EndState::Failed(e.to_string()),
            }
        };

        let duration = started.elapsed();
        let history = std::mem::take(&mut self.history);
        let outcome = match end {
            EndState::Completed => {
                self.logger.log(&LogEvent::RunCompleted {
                    cycles: cycles_run,
                    duration_secs: duration.as_secs_f64(),
                });
                RunOutcome::completed(cycles_run, history, duration)
            }
            EndState::KataComplete => {
                self.logger.log(&LogEvent::RunCompleted {
                    cycles: cycles_run,
                    duration_secs: duration.as_secs_f64(),
                });
                RunOutcome::kata_complete(cycles_run, history, duration)
            }
            EndState::Failed(error) => {
                warn!(error = %error, "Run failed");
                RunOutcome::failed(cycles_run, error, history, duration)
            }
            EndState::Interrupted => RunOutcome::interrupted(cycles_run, history, duration),
        };

        self.write_session_end(&outcome, started);
        outcome
    }

    async fn setup(&self) -> Result<(), CycleError> {
        self.runner.initialize().await?;
        self.store.init()?;
        self.logger.log(&LogEvent::SetupCompleted {
            work_dir: self.runner.work_dir().to_path_buf(),
        });
        Ok(())
    }

    /// One Red → Green → Refactor pass.
    async fn run_cycle(&mut self, cycle_number: usize) -> Result<CycleDisposition, CycleError> {
        let mut record = CycleRecord {
            cycle_number,
            tester: String::new(),
            implementer: None,
            refactorer: None,
            timestamp: Utc::now(),
        };

        // RED
        self.logger.log(&LogEvent::RoleStarted {
            cycle: cycle_number,
            role: Role::Tester,
        });
        let tester_outcome = self.tester.run(&self.context).await?;
        record.tester = tester_outcome.status_label().to_string();
        self.logger.log(&LogEvent::RoleCompleted {
            cycle: cycle_number,
            role: Role::Tester,
            status: record.tester.clone(),
        });

        match tester_outcome {
            TesterOutcome::Error { message } => {
                self.push_record(record);
                return Ok(CycleDisposition::StopError(format!("tester: {}", message)));
            }
            TesterOutcome::Done => {
                self.push_record(record);
                return Ok(CycleDisposition::StopClean);
            }
            TesterOutcome::Overshot { .. } => {
                // Wasted cycle: context untouched, nothing staged. The next
                // cycle's Tester sees the stray test and tries again.
                self.push_record(record);
                return Ok(CycleDisposition::Continue);
            }
            TesterOutcome::Red {
                path,
                content,
                result,
            } => {
                self.context.record_red(path, content, result);
            }
        }

        // GREEN
        self.logger.log(&LogEvent::RoleStarted {
            cycle: cycle_number,
            role: Role::Implementer,
        });
        let implementer_outcome = self.implementer.run(&self.context).await?;
        record.implementer = Some(implementer_outcome.status_label().to_string());
        self.logger.log(&LogEvent::RoleCompleted {
            cycle: cycle_number,
            role: Role::Implementer,
            status: implementer_outcome.status_label().to_string(),
        });

        match implementer_outcome {
            ImplementerOutcome::Error { message } | ImplementerOutcome::Failed { message } => {
                self.push_record(record);
                return Ok(CycleDisposition::StopError(format!(
                    "implementer: {}",
                    message
                )));
            }
            ImplementerOutcome::Green { .. } => {}
        }

        // REFACTOR
        self.logger.log(&LogEvent::RoleStarted {
            cycle: cycle_number,
            role: Role::Refactorer,
        });
        let refactorer_outcome = self.refactorer.run().await?;
        record.refactorer = Some(refactorer_outcome.status_label().to_string());
        self.logger.log(&LogEvent::RoleCompleted {
            cycle: cycle_number,
            role: Role::Refactorer,
            status: refactorer_outcome.status_label().to_string(),
        });

        match refactorer_outcome {
            RefactorerOutcome::Error { message } | RefactorerOutcome::Failed { message } => {
                // Non-fatal: the workspace is still green from the
                // Implementer's commit.
                self.logger.log(&LogEvent::ErrorEncountered {
                    role: Role::Refactorer,
                    error: message,
                });
            }
            RefactorerOutcome::Green { .. } | RefactorerOutcome::Skipped => {}
        }

        self.push_record(record);
        Ok(CycleDisposition::Continue)
    }

    fn push_record(&mut self, record: CycleRecord) {
        if let Some(session) = &self.session {
            session.write_cycle(
                record.cycle_number,
                &record.tester,
                record.implementer.as_deref(),
                record.refactorer.as_deref(),
                record.timestamp,
            );
        }
        self.history.push(record);
    }

    fn write_session_end(&self, outcome: &RunOutcome, started: Instant) {
        if let Some(session) = &self.session {
            session.write_end(
                outcome.label(),
                outcome.cycles(),
                started.elapsed().as_secs_f64(),
            );
        }
    }
}
