//! SQL-assertion helper and the database handles it drives.

use std::{process::Command, sync::OnceLock};

use regex::Regex;

use crate::{
    error::{CaseError, SqlError},
    process::run_command,
};

/// A statement executor obtained from a [`Connection`].
pub trait Cursor {
    /// Executes a statement and returns the affected row count.
    fn execute(&mut self, sql: &str) -> Result<u64, SqlError>;

    /// Runs a query and returns its rows as text cells.
    fn query(&mut self, sql: &str) -> Result<Vec<Vec<String>>, SqlError>;

    fn close(&mut self);
}

/// Opaque database handle owned by the harness.
pub trait Connection {
    fn cursor(&self) -> Result<Box<dyn Cursor>, SqlError>;

    fn describe(&self) -> String;
}

/// Shared assertion helper, initialized by a case's `init` and released by its `stop`.
#[derive(Default)]
pub struct SqlHelper {
    cursor: Option<Box<dyn Cursor>>,
    log_sql: bool,
    statements: Vec<String>,
    last_sql: String,
    rows: Vec<Vec<String>>,
}

impl SqlHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `cursor`, closing any cursor left from a previous case.
    pub fn init(&mut self, cursor: Box<dyn Cursor>, log_sql: bool) {
        if let Some(mut previous) = self.cursor.take() {
            previous.close();
        }
        self.cursor = Some(cursor);
        self.log_sql = log_sql;
        self.statements.clear();
        self.last_sql.clear();
        self.rows.clear();
    }

    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    /// Statements executed since `init`; empty unless SQL logging is on.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn execute(&mut self, sql: &str) -> Result<u64, SqlError> {
        self.record(sql);
        self.cursor()?.execute(sql)
    }

    /// Runs a query and keeps its rows for `check_rows` and `check_data`.
    pub fn query(&mut self, sql: &str) -> Result<usize, SqlError> {
        self.record(sql);
        let rows = self.cursor()?.query(sql)?;
        self.last_sql = sql.to_string();
        self.rows = rows;
        Ok(self.rows.len())
    }

    pub fn check_rows(&self, expected: usize) -> Result<(), SqlError> {
        if self.rows.len() == expected {
            Ok(())
        } else {
            Err(self.assertion(format!(
                "expected {expected} rows, got {}",
                self.rows.len()
            )))
        }
    }

    pub fn check_data(&self, row: usize, col: usize, expected: &str) -> Result<(), SqlError> {
        let Some(cells) = self.rows.get(row) else {
            return Err(self.assertion(format!(
                "row {row} out of range ({} rows)",
                self.rows.len()
            )));
        };
        match cells.get(col) {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(self.assertion(format!(
                "data[{row}][{col}] is `{actual}`, expected `{expected}`"
            ))),
            None => Err(self.assertion(format!(
                "column {col} out of range ({} columns)",
                cells.len()
            ))),
        }
    }

    /// Expects `sql` to be rejected by the server.
    pub fn error(&mut self, sql: &str) -> Result<(), SqlError> {
        self.record(sql);
        match self.cursor()?.execute(sql) {
            Ok(_) => Err(SqlError::UnexpectedSuccess {
                sql: sql.to_string(),
            }),
            Err(SqlError::Rejected { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub fn close(&mut self) -> Result<(), SqlError> {
        let mut cursor = self.cursor.take().ok_or(SqlError::NotInitialized)?;
        cursor.close();
        self.rows.clear();
        Ok(())
    }

    fn cursor(&mut self) -> Result<&mut Box<dyn Cursor>, SqlError> {
        self.cursor.as_mut().ok_or(SqlError::NotInitialized)
    }

    fn record(&mut self, sql: &str) {
        if self.log_sql {
            log::debug!(target: "sql", "{sql}");
            self.statements.push(sql.to_string());
        }
    }

    fn assertion(&self, message: String) -> SqlError {
        SqlError::Assertion {
            sql: self.last_sql.clone(),
            message,
        }
    }
}

/// Connection driving the database's command-line client, one process per statement.
#[derive(Debug, Clone)]
pub struct ShellConnection {
    client: String,
    args: Vec<String>,
}

impl ShellConnection {
    pub fn new(client: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            client: client.into(),
            args,
        }
    }
}

impl Connection for ShellConnection {
    fn cursor(&self) -> Result<Box<dyn Cursor>, SqlError> {
        Ok(Box::new(ShellCursor {
            client: self.client.clone(),
            args: self.args.clone(),
            closed: false,
        }))
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.client.clone()
        } else {
            format!("{} {}", self.client, self.args.join(" "))
        }
    }
}

struct ShellCursor {
    client: String,
    args: Vec<String>,
    closed: bool,
}

impl ShellCursor {
    fn run(&self, sql: &str) -> Result<ClientReply, SqlError> {
        if self.closed {
            return Err(SqlError::CursorClosed);
        }
        let mut command = Command::new(&self.client);
        command.args(&self.args).arg("-s").arg(sql);
        let output = run_command(command).map_err(|err| match err {
            CaseError::Spawn { source, .. } => SqlError::Client {
                client: self.client.clone(),
                source,
            },
            other => SqlError::Rejected {
                sql: sql.to_string(),
                message: other.to_string(),
            },
        })?;

        let reply = parse_client_output(&output.stdout);
        if let Some(message) = reply.error {
            return Err(SqlError::Rejected {
                sql: sql.to_string(),
                message,
            });
        }
        if !output.success() {
            return Err(SqlError::Rejected {
                sql: sql.to_string(),
                message: format!(
                    "client exited with {:?}: {}",
                    output.exit_code,
                    output.trimmed_stderr()
                ),
            });
        }
        Ok(reply)
    }
}

impl Cursor for ShellCursor {
    fn execute(&mut self, sql: &str) -> Result<u64, SqlError> {
        Ok(self.run(sql)?.row_count.unwrap_or(0))
    }

    fn query(&mut self, sql: &str) -> Result<Vec<Vec<String>>, SqlError> {
        Ok(self.run(sql)?.rows)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ClientReply {
    rows: Vec<Vec<String>>,
    row_count: Option<u64>,
    error: Option<String>,
}

fn ok_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+ OK, (\d+) row\(s\)").expect("valid regex"))
}

fn error_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"DB error:\s*(.*?)\s*(?:\([\d.]+s\))?$").expect("valid regex"))
}

fn parse_client_output(stdout: &str) -> ClientReply {
    let mut reply = ClientReply::default();
    let mut in_rows = false;
    for line in stdout.lines() {
        let trimmed = line.trim();
        if let Some(caps) = error_line().captures(trimmed) {
            reply.error = Some(caps[1].to_string());
            continue;
        }
        if let Some(caps) = ok_line().captures(trimmed) {
            reply.row_count = caps[1].parse().ok();
            in_rows = false;
            continue;
        }
        if trimmed.starts_with("===") {
            in_rows = true;
            continue;
        }
        if in_rows && trimmed.contains('|') {
            let mut cells: Vec<String> = trimmed.split('|').map(|c| c.trim().to_string()).collect();
            if cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            reply.rows.push(cells);
        }
    }
    reply
}
