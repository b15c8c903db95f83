use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;

use crate::{
    case::{CaseContext, TestCase},
    error::CaseError,
    logging::LogSink,
    manifest::Manifest,
    registry::{CaseRegistry, Platform},
    sql::Connection,
};

pub struct RunOptions {
    pub workspace: PathBuf,
    pub platform: Platform,
    pub filter: Option<Regex>,
    /// Overrides the manifest's `log_sql` when set.
    pub log_sql: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CaseDetail {
    pub name: String,
    pub file: String,
    pub status: CaseStatus,
    pub duration_ms: u128,
    pub allow_failure: bool,
    pub error: Option<String>,
    pub log_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub suite: String,
    pub description: Option<String>,
    pub platform: Platform,
    pub connection: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub soft_failed: usize,
    pub log_file: PathBuf,
    pub error_log: Option<PathBuf>,
    pub case_logs_root: PathBuf,
    pub cases: Vec<CaseDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    SoftFailed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Passed => "passed",
            CaseStatus::Failed => "failed",
            CaseStatus::SoftFailed => "soft_failed",
        }
    }
}

/// Drives one case through `init`, `run` and `stop`.
///
/// `stop` runs whenever `init` succeeded, whatever `run` returned. The first
/// error wins.
pub fn execute_case(
    case: &mut dyn TestCase,
    ctx: &mut CaseContext,
    conn: &dyn Connection,
    log_sql: bool,
) -> Result<(), CaseError> {
    case.init(ctx, conn, log_sql)?;
    let ran = case.run(ctx);
    let stopped = case.stop(ctx);
    ran.and(stopped)
}

/// Runs every registered case selected by `options` and writes the run logs.
///
/// Case failures are reported in the summary, not as an error.
pub fn run_suite(
    registry: &mut CaseRegistry,
    manifest: &Manifest,
    conn: &dyn Connection,
    options: &RunOptions,
    log: Box<dyn LogSink>,
) -> Result<RunSummary> {
    let workspace = options.workspace.as_path();
    let log_sql = options.log_sql.unwrap_or(manifest.log_sql);

    let logs_root = workspace.join("logs");
    fs::create_dir_all(&logs_root)?;
    let timestamp = Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
    let run_dir = create_run_dir(&logs_root, &timestamp)?;
    let case_logs_root = run_dir.join("cases");
    fs::create_dir_all(&case_logs_root)?;
    let run_log_path = run_dir.join("suite.log");
    let mut run_log = File::create(&run_log_path)?;
    let start = Local::now();
    let suite_label = manifest
        .name
        .clone()
        .unwrap_or_else(|| "taos cases".to_string());

    writeln!(
        run_log,
        "[suite] {} ({}) - {}",
        suite_label,
        options.platform,
        manifest
            .description
            .as_deref()
            .unwrap_or("no description provided")
    )?;
    writeln!(run_log, "[suite] connection: {}", conn.describe())?;

    let mut ctx = CaseContext::new(workspace, log);
    let mut case_details = Vec::new();
    let (mut passed, mut failed, mut soft_failed) = (0usize, 0usize, 0usize);

    for descriptor in registry.cases_for(options.platform) {
        let case = descriptor.case.as_mut();
        let name = case.name().to_string();
        if let Some(filter) = &options.filter {
            if !filter.is_match(&name) && !filter.is_match(&descriptor.file) {
                writeln!(run_log, "[case] skipping {name} (filtered)")?;
                continue;
            }
        }

        let case_slug = sanitize_case_name(&name);
        let case_log_path = case_logs_root.join(format!("{case_slug}.log"));
        let mut case_log = File::create(&case_log_path)?;
        writeln!(case_log, "[case] {name} ({})", descriptor.file)?;
        ctx.set_transcript(Some(case_log));
        writeln!(
            run_log,
            "[case] starting {} -> {}",
            name,
            rel_path(&case_log_path, workspace).display()
        )?;

        let started = Instant::now();
        let result = execute_case(case, &mut ctx, conn, log_sql);
        let duration_ms = started.elapsed().as_millis();
        ctx.set_transcript(None);

        let allow_failure = manifest.allow_failure(&name);
        let status = match (&result, allow_failure) {
            (Ok(()), _) => CaseStatus::Passed,
            (Err(_), true) => CaseStatus::SoftFailed,
            (Err(_), false) => CaseStatus::Failed,
        };
        match status {
            CaseStatus::Passed => passed += 1,
            CaseStatus::Failed => failed += 1,
            CaseStatus::SoftFailed => soft_failed += 1,
        }

        let error = result.err().map(|err| err.to_string());
        writeln!(
            run_log,
            "[case] {} {} in {} ms",
            name,
            status.as_str(),
            duration_ms
        )?;
        if let Some(err) = &error {
            writeln!(run_log, "        {err}")?;
            log::warn!("{name}: {err}");
        }

        case_details.push(CaseDetail {
            name,
            file: descriptor.file.clone(),
            status,
            duration_ms,
            allow_failure,
            error,
            log_path: rel_path(&case_log_path, workspace),
        });
    }

    let end = Local::now();
    let error_log_path = run_dir.join("error.log");
    let mut error_log = None;
    if failed > 0 {
        let message = format!(
            "{} cases failed. See {} for details.",
            failed,
            rel_path(&run_log_path, workspace).display()
        );
        fs::write(&error_log_path, message)?;
        error_log = Some(rel_path(&error_log_path, workspace));
    }

    let summary = RunSummary {
        suite: suite_label,
        description: manifest.description.clone(),
        platform: options.platform,
        connection: conn.describe(),
        started_at: start,
        finished_at: end,
        total: case_details.len(),
        passed,
        failed,
        soft_failed,
        log_file: rel_path(&run_log_path, workspace),
        error_log,
        case_logs_root: rel_path(&case_logs_root, workspace),
        cases: case_details,
    };

    let summary_path = logs_root.join("last_run.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    Ok(summary)
}

/// Creates a run directory no earlier run has used, suffixing `-1`, `-2`, ... on collision.
fn create_run_dir(logs_root: &Path, timestamp: &str) -> Result<PathBuf> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            timestamp.to_string()
        } else {
            format!("{timestamp}-{attempt}")
        };
        let dir = logs_root.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to create run directory {}", dir.display()));
            }
        }
    }
}

fn rel_path(path: &Path, workspace: &Path) -> PathBuf {
    path.strip_prefix(workspace).unwrap_or(path).to_path_buf()
}

fn sanitize_case_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_case_names() {
        assert_eq!(sanitize_case_name("Client Config!"), "client-config");
        assert_eq!(sanitize_case_name("--x_y--"), "x-y");
    }

    #[test]
    fn run_dirs_never_collide() {
        let root = tempfile::tempdir().unwrap();
        let first = create_run_dir(root.path(), "20260101-000000.000").unwrap();
        let second = create_run_dir(root.path(), "20260101-000000.000").unwrap();
        let third = create_run_dir(root.path(), "20260101-000000.000").unwrap();

        assert!(first.ends_with("20260101-000000.000"));
        assert!(second.ends_with("20260101-000000.000-1"));
        assert!(third.ends_with("20260101-000000.000-2"));
    }

    #[test]
    fn rel_path_strips_workspace() {
        let ws = Path::new("/tmp/ws");
        assert_eq!(rel_path(Path::new("/tmp/ws/logs/a.log"), ws), PathBuf::from("logs/a.log"));
        assert_eq!(rel_path(Path::new("/var/a.log"), ws), PathBuf::from("/var/a.log"));
    }
}
