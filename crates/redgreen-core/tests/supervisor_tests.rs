mod common;

use common::*;
use std::sync::Arc;
use tempfile::TempDir;

use redgreen_core::roles::{Implementer, Refactorer, Tester};
use redgreen_core::{RunOutcome, Supervisor};
use redgreen_git::SnapshotStore;
use redgreen_runner::CommandResult;

const KATA_RULES: &str = "Implement a function doubling an integer.";

const TEST_RESPONSE: &str = "### tests/test_double.rs\n```rust\nuse kata::double;\n\n#[test]\nfn doubles_two() {\n    assert_eq!(double(2), 4);\n}\n```";

const IMPL_RESPONSE: &str =
    "### src/lib.rs\n```rust\npub fn double(x: i64) -> i64 {\n    x * 2\n}\n```";

fn build_supervisor(
    tmp: &TempDir,
    responses: &[&str],
    results: Vec<CommandResult>,
    max_cycles: usize,
) -> (Supervisor, Arc<FakeRunner>, Arc<SnapshotStore>) {
    let llm = ScriptedLlm::new(responses);
    let runner = FakeRunner::new(tmp.path().to_path_buf(), results);
    let store = init_store(tmp.path());
    let logger = quiet_logger();

    let tester = Tester::new(
        llm.clone(),
        runner.clone(),
        store.clone(),
        logger.clone(),
        KATA_RULES.to_string(),
    );
    let implementer = Implementer::new(
        llm.clone(),
        runner.clone(),
        store.clone(),
        logger.clone(),
        KATA_RULES.to_string(),
        5,
    );
    let refactorer = Refactorer::new(
        llm,
        runner.clone(),
        store.clone(),
        logger.clone(),
        KATA_RULES.to_string(),
        5,
    );

    let supervisor = Supervisor::new(
        tester,
        implementer,
        refactorer,
        runner.clone(),
        store.clone(),
        logger,
        max_cycles,
    );
    (supervisor, runner, store)
}

#[tokio::test]
async fn full_cycle_then_kata_complete() {
    let tmp = TempDir::new().unwrap();
    let (supervisor, runner, store) = build_supervisor(
        &tmp,
        &[
            TEST_RESPONSE,        // cycle 1: tester
            IMPL_RESPONSE,        // cycle 1: implementer
            "NO_REFACTOR_NEEDED", // cycle 1: refactorer
            "KATA_COMPLETE",      // cycle 2: tester
        ],
        vec![failing("error[E0425]"), passing()],
        5,
    );

    let outcome = supervisor.run().await;

    let RunOutcome::KataComplete { cycles, history, .. } = outcome else {
        panic!("expected kata completion");
    };
    assert_eq!(cycles, 1);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].tester, "red");
    assert_eq!(history[0].implementer.as_deref(), Some("green"));
    assert_eq!(history[0].refactorer.as_deref(), Some("skipped"));
    assert_eq!(history[1].tester, "done");
    assert!(history[1].implementer.is_none());

    // One commit for the green phase; the skip left it untouched
    assert_eq!(
        head_commit_message(tmp.path()),
        "feat: make tests/test_double.rs pass"
    );
    assert!(store.status().unwrap().is_clean());
    assert_eq!(runner.test_runs(), 2);
}

#[tokio::test]
async fn tester_error_is_a_hard_stop() {
    let tmp = TempDir::new().unwrap();
    let (supervisor, runner, _store) = build_supervisor(
        &tmp,
        &["I cannot write a test for this."],
        vec![],
        5,
    );

    let outcome = supervisor.run().await;

    let RunOutcome::Failed { cycles, error, .. } = outcome else {
        panic!("expected failure");
    };
    assert_eq!(cycles, 0);
    assert!(error.contains("tester"));
    assert_eq!(runner.test_runs(), 0);
}

#[tokio::test]
async fn overshot_wastes_the_cycle_and_continues() {
    let tmp = TempDir::new().unwrap();
    let (supervisor, _runner, store) = build_supervisor(
        &tmp,
        &[TEST_RESPONSE, "KATA_COMPLETE"],
        vec![passing()],
        5,
    );

    let outcome = supervisor.run().await;

    let RunOutcome::KataComplete { cycles, history, .. } = outcome else {
        panic!("expected kata completion");
    };
    assert_eq!(cycles, 1);
    assert_eq!(history[0].tester, "overshot");
    assert!(history[0].implementer.is_none());
    // Overshot stages nothing
    assert!(!store.has_staged_changes().unwrap());
}

#[tokio::test]
async fn implementer_failure_is_a_hard_stop() {
    let tmp = TempDir::new().unwrap();
    let (supervisor, runner, _store) = build_supervisor(
        &tmp,
        &[
            TEST_RESPONSE,
            IMPL_RESPONSE,
            IMPL_RESPONSE,
            IMPL_RESPONSE,
            IMPL_RESPONSE,
            IMPL_RESPONSE,
        ],
        vec![
            failing("error[E0425]"), // tester red
            failing("mismatch"),     // implementer attempts 1-5
            failing("mismatch"),
            failing("mismatch"),
            failing("mismatch"),
            failing("mismatch"),
        ],
        5,
    );

    let outcome = supervisor.run().await;

    let RunOutcome::Failed { cycles, error, .. } = outcome else {
        panic!("expected failure");
    };
    assert_eq!(cycles, 0);
    assert!(error.contains("implementer"));
    // one tester run plus the full implementer budget
    assert_eq!(runner.test_runs(), 6);
}

#[tokio::test]
async fn refactor_failure_is_non_fatal() {
    let tmp = TempDir::new().unwrap();
    let (supervisor, _runner, _store) = build_supervisor(
        &tmp,
        &[
            TEST_RESPONSE,                          // cycle 1: tester
            IMPL_RESPONSE,                          // cycle 1: implementer
            "Looks fine already, nothing to send.", // cycle 1: refactorer (no code)
            "KATA_COMPLETE",                        // cycle 2: tester
        ],
        vec![failing("error[E0425]"), passing()],
        5,
    );

    let outcome = supervisor.run().await;

    let RunOutcome::KataComplete { cycles, history, .. } = outcome else {
        panic!("expected kata completion despite refactor error");
    };
    assert_eq!(cycles, 1);
    assert_eq!(history[0].refactorer.as_deref(), Some("error"));
}

#[tokio::test]
async fn cycle_budget_bounds_the_run() {
    let tmp = TempDir::new().unwrap();
    let (supervisor, _runner, _store) = build_supervisor(
        &tmp,
        &[TEST_RESPONSE, IMPL_RESPONSE, "NO_REFACTOR_NEEDED"],
        vec![failing("error[E0425]"), passing()],
        1,
    );

    let outcome = supervisor.run().await;

    assert!(outcome.is_success());
    assert_eq!(outcome.exit_code(), 0);
    let RunOutcome::Completed { cycles, .. } = outcome else {
        panic!("expected completion at the cycle budget");
    };
    assert_eq!(cycles, 1);
}
