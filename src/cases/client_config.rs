//! Client configuration test: rebuilds and runs the native `clientcfgtest` program.

use std::{
    fs,
    path::Path,
    process::Command,
};

use crate::{
    case::{CaseContext, Lifecycle, TestCase},
    error::CaseError,
    manifest::ClientConfigSettings,
    process::run_command,
    sql::Connection,
};

pub const NAME: &str = "client-config";
pub const FILE: &str = file!();

pub struct ConfigTestCase {
    settings: ClientConfigSettings,
    state: Lifecycle,
}

impl ConfigTestCase {
    pub fn new(settings: ClientConfigSettings) -> Self {
        Self {
            settings,
            state: Lifecycle::Registered,
        }
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    fn make(&self, project_dir: &Path, target: Option<&str>) -> Command {
        let mut command = Command::new(&self.settings.make_program);
        command
            .args(&self.settings.make_args)
            .current_dir(project_dir);
        if let Some(target) = target {
            command.arg(target);
        }
        command
    }

    fn build_step(
        &self,
        ctx: &mut CaseContext,
        label: &str,
        command: Command,
    ) -> Result<(), CaseError> {
        let output = run_command(command)?;
        ctx.record_step(label, &output)?;
        if output.success() {
            Ok(())
        } else {
            Err(CaseError::ExternalBuildFailed {
                step: output.program.clone(),
                exit_code: output.exit_code,
                stderr: output.trimmed_stderr().to_string(),
            })
        }
    }

    fn execute(&self, ctx: &mut CaseContext) -> Result<(), CaseError> {
        let project_dir = ctx.resolve(&self.settings.project_dir);
        if !project_dir.is_dir() {
            return Err(CaseError::ExternalBuildFailed {
                step: format!("cd {}", project_dir.display()),
                exit_code: None,
                stderr: "project directory does not exist".into(),
            });
        }

        // Absolute, so the binary path stays valid once the child changes directory.
        let project_dir = fs::canonicalize(&project_dir)?;

        let clean = self.make(&project_dir, Some("clean"));
        self.build_step(ctx, "clean", clean)?;
        let build = self.make(&project_dir, None);
        self.build_step(ctx, "build", build)?;

        let binary = project_dir.join(&self.settings.binary);
        let mut command = Command::new(&binary);
        command.current_dir(&project_dir);
        let output = run_command(command)?;
        ctx.record_step("run", &output)?;
        if !output.success() {
            return Err(CaseError::ExternalTestFailed {
                binary,
                exit_code: output.exit_code,
                stderr: output.trimmed_stderr().to_string(),
            });
        }
        ctx.log.info(&format!("{} passed", self.settings.binary));
        Ok(())
    }
}

impl TestCase for ConfigTestCase {
    fn name(&self) -> &str {
        NAME
    }

    fn file(&self) -> &str {
        FILE
    }

    fn init(
        &mut self,
        ctx: &mut CaseContext,
        conn: &dyn Connection,
        log_sql: bool,
    ) -> Result<(), CaseError> {
        self.state.expect(NAME, "init", |s| {
            matches!(s, Lifecycle::Registered | Lifecycle::Stopped)
        })?;
        ctx.log.debug(&format!("start to execute {FILE}"));
        ctx.sql.init(conn.cursor()?, log_sql);
        self.state = Lifecycle::Initialized;
        Ok(())
    }

    fn run(&mut self, ctx: &mut CaseContext) -> Result<(), CaseError> {
        self.state
            .expect(NAME, "run", |s| *s == Lifecycle::Initialized)?;
        let result = self.execute(ctx);
        self.state = Lifecycle::Ran {
            failed: result.is_err(),
        };
        result
    }

    fn stop(&mut self, ctx: &mut CaseContext) -> Result<(), CaseError> {
        self.state.expect(NAME, "stop", |s| {
            matches!(s, Lifecycle::Initialized | Lifecycle::Ran { .. })
        })?;
        let failed = matches!(self.state, Lifecycle::Ran { failed: true });
        self.state = Lifecycle::Stopped;
        let closed = ctx.sql.close();
        if failed {
            ctx.log.error(&format!("{FILE} failed"));
        } else {
            ctx.log.success(&format!("{FILE} successfully executed"));
        }
        Ok(closed?)
    }
}
