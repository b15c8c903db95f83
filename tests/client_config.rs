#![cfg(unix)]

mod common;

use common::FakeProject;
use taos_case_harness::{
    CaseContext, CaseError, TestCase,
    cases::client_config::{ConfigTestCase, FILE},
    logging::{LogLevel, RecordingLog},
    runner::execute_case,
    sql::ShellConnection,
};

fn offline() -> ShellConnection {
    ShellConnection::new("taos", Vec::new())
}

#[test]
fn run_cleans_builds_then_executes_once() {
    let project = FakeProject::new(0, 0);
    let log = RecordingLog::new();
    let mut ctx = CaseContext::new(project.workspace(), Box::new(log.clone()));
    let mut case = ConfigTestCase::new(project.settings.clone());

    execute_case(&mut case, &mut ctx, &offline(), false).expect("case should pass");

    assert_eq!(project.trace_lines(), ["make clean", "make all", "run"]);
    assert!(!ctx.sql.is_open(), "stop releases the sql helper");

    let entries = log.entries();
    assert_eq!(entries.first().unwrap().level, LogLevel::Debug);
    assert!(entries.first().unwrap().message.contains(FILE));
    let last = entries.last().unwrap();
    assert_eq!(last.level, LogLevel::Success);
    assert_eq!(last.message, format!("{FILE} successfully executed"));
    assert!(
        entries
            .iter()
            .any(|e| e.level == LogLevel::Info && e.message == "clientcfgtest passed")
    );
}

#[test]
fn build_failure_stops_before_running_binary() {
    let project = FakeProject::new(2, 0);
    let log = RecordingLog::new();
    let mut ctx = CaseContext::new(project.workspace(), Box::new(log.clone()));
    let mut case = ConfigTestCase::new(project.settings.clone());

    let err = execute_case(&mut case, &mut ctx, &offline(), false).unwrap_err();
    match err {
        CaseError::ExternalBuildFailed {
            step,
            exit_code,
            stderr,
        } => {
            assert!(step.ends_with("make.sh"), "unexpected step {step}");
            assert_eq!(exit_code, Some(2));
            assert_eq!(stderr, "clientcfgtest.c: compile error");
        }
        other => panic!("expected build failure, got {other:?}"),
    }

    assert_eq!(project.trace_lines(), ["make clean", "make all"]);
    assert!(!ctx.sql.is_open(), "stop still runs after a failed build");
    let last = log.entries().pop().unwrap();
    assert_eq!(last.level, LogLevel::Error);
    assert_eq!(last.message, format!("{FILE} failed"));
}

#[test]
fn failing_binary_is_reported_as_test_failure() {
    let project = FakeProject::new(0, 1);
    let log = RecordingLog::new();
    let mut ctx = CaseContext::new(project.workspace(), Box::new(log.clone()));
    let mut case = ConfigTestCase::new(project.settings.clone());

    let err = execute_case(&mut case, &mut ctx, &offline(), false).unwrap_err();
    match err {
        CaseError::ExternalTestFailed {
            binary,
            exit_code,
            stderr,
        } => {
            assert!(binary.ends_with("api/clientcfgtest"));
            assert_eq!(exit_code, Some(1));
            assert_eq!(stderr, "taosSetConfig mismatch");
        }
        other => panic!("expected test failure, got {other:?}"),
    }
    assert_eq!(project.trace_lines(), ["make clean", "make all", "run"]);
}

#[test]
fn case_can_run_again_after_stop() {
    let project = FakeProject::new(0, 0);
    let mut ctx = CaseContext::new(project.workspace(), Box::new(RecordingLog::new()));
    let mut case = ConfigTestCase::new(project.settings.clone());
    let conn = offline();

    execute_case(&mut case, &mut ctx, &conn, false).unwrap();
    case.init(&mut ctx, &conn, false).unwrap();
    case.run(&mut ctx).unwrap();
    case.stop(&mut ctx).unwrap();

    assert_eq!(project.trace_lines().len(), 6);
}
