//! The lifecycle contract shared by all test cases.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    error::CaseError,
    logging::LogSink,
    process::CommandOutput,
    sql::{Connection, SqlHelper},
};

/// Everything a case may touch, owned by the harness and lent to the case.
pub struct CaseContext {
    pub sql: SqlHelper,
    pub log: Box<dyn LogSink>,
    pub workspace: PathBuf,
    transcript: Option<File>,
}

impl CaseContext {
    pub fn new(workspace: impl Into<PathBuf>, log: Box<dyn LogSink>) -> Self {
        Self {
            sql: SqlHelper::new(),
            log,
            workspace: workspace.into(),
            transcript: None,
        }
    }

    /// Sends step output to `file` in addition to the log sink; `None` stops it.
    pub fn set_transcript(&mut self, file: Option<File>) {
        self.transcript = file;
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.workspace.join(path)
    }

    /// Appends a finished step to the case transcript.
    pub fn record_step(&mut self, label: &str, output: &CommandOutput) -> Result<(), CaseError> {
        self.log.debug(&format!(
            "[{label}] `{}` exited with {:?} after {} ms",
            output.program, output.exit_code, output.duration_ms
        ));
        if let Some(file) = self.transcript.as_mut() {
            writeln!(file, "[{label}] command: {}", output.program)?;
            file.write_all(output.stdout.as_bytes())?;
            file.write_all(output.stderr.as_bytes())?;
            writeln!(file, "[{label}] exit {:?} in {} ms", output.exit_code, output.duration_ms)?;
        }
        Ok(())
    }
}

/// A registered test case. The harness calls `init`, then `run`, then `stop` exactly once.
pub trait TestCase {
    /// Short name used for log files and case selection.
    fn name(&self) -> &str;

    /// Source file the case is defined in; its identity in the registry.
    fn file(&self) -> &str;

    fn init(
        &mut self,
        ctx: &mut CaseContext,
        conn: &dyn Connection,
        log_sql: bool,
    ) -> Result<(), CaseError>;

    fn run(&mut self, ctx: &mut CaseContext) -> Result<(), CaseError>;

    fn stop(&mut self, ctx: &mut CaseContext) -> Result<(), CaseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Registered,
    Initialized,
    Ran { failed: bool },
    Stopped,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Registered => "registered",
            Lifecycle::Initialized => "initialized",
            Lifecycle::Ran { .. } => "already run",
            Lifecycle::Stopped => "stopped",
        }
    }

    /// Fails with `CaseError::Lifecycle` unless `allowed` accepts the current state.
    pub fn expect(
        &self,
        case: &str,
        operation: &'static str,
        allowed: impl Fn(&Lifecycle) -> bool,
    ) -> Result<(), CaseError> {
        if allowed(self) {
            Ok(())
        } else {
            Err(CaseError::Lifecycle {
                case: case.to_string(),
                operation,
                state: self.as_str(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expect_reports_state() {
        let state = Lifecycle::Registered;
        let err = state
            .expect("client-config", "run", |s| *s == Lifecycle::Initialized)
            .unwrap_err();
        assert_eq!(err.to_string(), "client-config: run called while registered");
    }
}
