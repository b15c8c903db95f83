use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use env_logger::Env;
use regex::Regex;

use taos_case_harness::{
    cases,
    logging::ConsoleLog,
    manifest::{Manifest, load_manifest},
    registry::{CaseRegistry, Platform},
    runner::{RunOptions, run_suite},
    sql::ShellConnection,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::init_from_env(Env::default().filter_or("RUST_LOG", &cli.log_level));

    let workspace = fs::canonicalize(&cli.workspace)
        .with_context(|| format!("failed to resolve workspace {}", cli.workspace.display()))?;

    match cli.action {
        Action::Run => run(&cli, workspace),
        Action::List => list(&cli, workspace),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "taos-case-harness",
    version,
    about = "Runs database client test cases"
)]
struct Cli {
    #[arg(value_enum, default_value = "run")]
    action: Action,
    #[arg(long, default_value = ".")]
    workspace: PathBuf,
    /// Platform whose cases are selected; defaults to the host.
    #[arg(long, value_enum)]
    platform: Option<Host>,
    /// Only run cases whose name or file matches this pattern.
    #[arg(long)]
    filter: Option<String>,
    /// Record every SQL statement the cases execute.
    #[arg(long)]
    log_sql: bool,
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Action {
    Run,
    List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Host {
    Windows,
    Linux,
}

impl Cli {
    fn host(&self) -> Platform {
        match self.platform {
            Some(Host::Windows) => Platform::Windows,
            Some(Host::Linux) => Platform::Linux,
            None => Platform::current(),
        }
    }
}

fn build_registry(workspace: &Path) -> Result<(Manifest, CaseRegistry)> {
    let manifest = load_manifest(workspace)?;
    let mut registry = CaseRegistry::new();
    cases::register_all(&mut registry, &manifest)?;
    if registry.is_empty() {
        bail!("no cases registered");
    }
    Ok((manifest, registry))
}

fn run(cli: &Cli, workspace: PathBuf) -> Result<()> {
    let (manifest, mut registry) = build_registry(&workspace)?;
    let filter = cli
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid --filter pattern")?;
    let options = RunOptions {
        workspace,
        platform: cli.host(),
        filter,
        log_sql: cli.log_sql.then_some(true),
    };
    let conn = ShellConnection::new(manifest.sql.client.clone(), manifest.sql.args.clone());

    let summary = run_suite(&mut registry, &manifest, &conn, &options, Box::new(ConsoleLog))?;
    if summary.total == 0 {
        bail!("no cases selected for {}", options.platform);
    }

    let line = format!(
        "{} completed: {}/{} passed ({} soft failures). Log: {}",
        summary.suite,
        summary.passed,
        summary.total,
        summary.soft_failed,
        summary.log_file.display()
    );
    if summary.failed > 0 {
        println!("{}", line.red());
        bail!("{} failed. Consult {}", summary.suite, summary.log_file.display());
    }
    println!("{}", line.green());
    Ok(())
}

fn list(cli: &Cli, workspace: PathBuf) -> Result<()> {
    let (_, mut registry) = build_registry(&workspace)?;
    let platform = cli.host();
    for descriptor in registry.cases_for(platform) {
        println!(
            "{:<16} {:<8} {}",
            descriptor.case.name(),
            descriptor.platform,
            descriptor.file
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_flag_selects_a_single_host() {
        let cli = Cli::try_parse_from(["taos-case-harness", "list", "--platform", "windows"]).unwrap();
        assert_eq!(cli.host(), Platform::Windows);

        let cli = Cli::try_parse_from(["taos-case-harness"]).unwrap();
        assert_eq!(cli.host(), Platform::current());

        assert!(Cli::try_parse_from(["taos-case-harness", "run", "--platform", "both"]).is_err());
    }
}
