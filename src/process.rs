//! External process invocation with captured, structured results.

use std::{
    fmt,
    process::{Command, Stdio},
    time::Instant,
};

use crate::error::CaseError;

/// Result of a finished child process, stdout/stderr decoded lossily as UTF-8.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub program: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u128,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Standard error with surrounding whitespace removed.
    pub fn trimmed_stderr(&self) -> &str {
        self.stderr.trim()
    }
}

/// Printable form of a command line, used in logs and error messages.
pub struct CommandLine<'a>(pub &'a Command);

impl fmt::Display for CommandLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.get_program().to_string_lossy())?;
        for arg in self.0.get_args() {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Runs `command` to completion, blocking, with stdout and stderr piped.
///
/// A non-zero exit is not an error here; callers classify the outcome.
pub fn run_command(mut command: Command) -> Result<CommandOutput, CaseError> {
    let program = CommandLine(&command).to_string();
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    log::debug!("spawning `{program}`");
    let start = Instant::now();
    let output = command.output().map_err(|source| CaseError::Spawn {
        program: program.clone(),
        source,
    })?;
    let duration_ms = start.elapsed().as_millis();

    Ok(CommandOutput {
        program,
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration_ms,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_exit_code() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo taos-harness; echo oops >&2; exit 3");

        let output = run_command(command).expect("spawn sh");
        assert_eq!(output.stdout, "taos-harness\n");
        assert_eq!(output.trimmed_stderr(), "oops");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.program, "sh -c echo taos-harness; echo oops >&2; exit 3");
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let command = Command::new("/nonexistent/taos-harness-missing");
        match run_command(command) {
            Err(CaseError::Spawn { program, .. }) => {
                assert_eq!(program, "/nonexistent/taos-harness-missing")
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }
}
