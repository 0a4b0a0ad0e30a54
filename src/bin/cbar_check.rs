//! Colorbar archive compliance checker.
//!
//! Checks the built-in archive (and any extra YAML directories) and prints
//! every finding. Exit code 0 when compliant, 1 otherwise, so it slots into
//! CI unchanged.
//!
//! # Usage
//!
//! ```bash
//! # Check the built-in archive
//! cbar_check
//!
//! # Check user archives on top of the built-in set
//! cbar_check ~/colorbars ./project/colorbars
//!
//! # Machine output for CI tooling
//! cbar_check --format json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::Colorize;

use cbar_core::{ArchiveChecker, CheckReport, Severity};

#[derive(Parser)]
#[command(name = "cbar_check")]
#[command(version = "0.1.0")]
#[command(about = "Validate colorbar YAML archives and report every finding")]
#[command(long_about = None)]
struct Cli {
    /// Extra archive directories to check (recursively, *.yaml / *.yml)
    dirs: Vec<PathBuf>,

    /// Output format: json, text, or pretty (default)
    #[arg(long, short = 'o', default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Suppress non-essential output (summary only)
    #[arg(long, short)]
    quiet: bool,

    /// Skip the built-in archive and check only the given directories
    #[arg(long)]
    no_builtin: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
    Pretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut checker = if cli.no_builtin {
        ArchiveChecker::without_builtin()
    } else {
        ArchiveChecker::new()
    };
    for dir in &cli.dirs {
        checker = checker.with_dir(dir);
    }
    let report = checker.run();

    match render(&cli, &report) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("{}: {e:#}", "error".red().bold());
            return ExitCode::FAILURE;
        }
    }

    if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn render(cli: &Cli, report: &CheckReport) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(report).context("serializing check report")?;
            println!("{json}");
        }
        OutputFormat::Text => {
            println!(
                "checked {} record(s): {} error(s), {} warning(s)",
                report.checked,
                report.error_count(),
                report.warning_count()
            );
            if !cli.quiet {
                for finding in &report.findings {
                    println!("{finding}");
                }
            }
        }
        OutputFormat::Pretty => {
            if !cli.quiet {
                for finding in &report.findings {
                    let severity = match finding.severity {
                        Severity::Error => "error".red().bold(),
                        Severity::Warn => "warning".yellow().bold(),
                        Severity::Info => "info".blue(),
                    };
                    println!(
                        "{severity}[{}] {}: {}",
                        finding.code.dimmed(),
                        finding.path.cyan(),
                        finding.message
                    );
                    if let Some(hint) = &finding.hint {
                        println!("  {} {hint}", "hint:".green());
                    }
                }
                if !report.findings.is_empty() {
                    println!();
                }
            }
            let verdict = if report.passed() {
                "PASS".green().bold()
            } else {
                "FAIL".red().bold()
            };
            println!(
                "{verdict} - checked {} record(s): {} error(s), {} warning(s)",
                report.checked,
                report.error_count(),
                report.warning_count()
            );
        }
    }
    Ok(())
}
