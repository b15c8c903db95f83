#![cfg(unix)]

mod common;

use std::{env, path::Path};

use common::FakeProject;
use taos_case_harness::{
    CaseContext, cases::client_config::ConfigTestCase, logging::RecordingLog,
    runner::execute_case, sql::ShellConnection,
};

// Kept alone in this file: it changes the process working directory.
#[test]
fn relative_workspace_runs_binary_from_project_dir() {
    let project = FakeProject::new(0, 0);
    let parent = project.workspace().parent().expect("tempdir has a parent");
    let name = project.workspace().file_name().expect("tempdir has a name");
    env::set_current_dir(parent).expect("enter tempdir parent");

    let mut ctx = CaseContext::new(Path::new(name), Box::new(RecordingLog::new()));
    let mut case = ConfigTestCase::new(project.settings.clone());

    execute_case(&mut case, &mut ctx, &ShellConnection::new("taos", vec![]), false)
        .expect("relative workspace should pass");
    assert_eq!(project.trace_lines(), ["make clean", "make all", "run"]);
}
