mod display;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use scangate_core::gate::{generate_default_policy, load_policy};
use scangate_core::normalize::Mode;
use scangate_core::{aggregate, runner, GatePolicy, RunnerOptions, SourceTool, ToolInput};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "scangate",
    version,
    about = "scangate — unify security-scan reports and gate the merge",
    long_about = "Aggregate the outputs of tflint, ansible-lint, Trivy, Checkov, Semgrep, \
Gitleaks and Grype into one deduplicated report, and decide whether the pipeline may proceed."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate tool reports, evaluate the gate, and emit the unified report
    Run {
        /// Tool report to ingest, as TOOL=PATH (e.g. trivy=reports/trivy.json).
        /// Repeatable.
        #[arg(short, long = "input", value_parser = parse_input)]
        inputs: Vec<ToolInput>,

        /// Directory of tool reports named after their tool
        /// (trivy.json, gitleaks.txt, ...)
        #[arg(long)]
        reports_dir: Option<PathBuf>,

        /// Gate policy file (TOML). Defaults to the built-in policy.
        #[arg(short, long)]
        policy: Option<PathBuf>,

        /// Write the machine-readable report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the merge-request comment (markdown) here
        #[arg(long)]
        comment: Option<PathBuf>,

        /// Stdout format (text, json, markdown)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Parser parallelism (defaults to core count)
        #[arg(long)]
        jobs: Option<usize>,

        /// Per-tool parse timeout in seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,

        /// Fail on unknown severity values instead of degrading to medium
        #[arg(long)]
        strict: bool,
    },

    /// Write a starter gate policy file
    InitPolicy {
        /// Output path
        #[arg(default_value = "scangate.toml")]
        path: PathBuf,
    },
}

fn parse_input(value: &str) -> Result<ToolInput, String> {
    let (tool, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TOOL=PATH, got '{}'", value))?;
    Ok(ToolInput {
        tool: tool.parse::<SourceTool>()?,
        path: PathBuf::from(path),
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            2
        }
    };
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            inputs,
            reports_dir,
            policy,
            output,
            comment,
            format,
            jobs,
            timeout_secs,
            strict,
        } => {
            cmd_run(
                inputs,
                reports_dir.as_deref(),
                policy.as_deref(),
                output.as_deref(),
                comment.as_deref(),
                &format,
                jobs,
                timeout_secs,
                strict,
            )
            .await
        }
        Commands::InitPolicy { path } => cmd_init_policy(&path),
    }
}

/// Discover tool reports in a directory by filename stem
/// (`trivy.json`, `gitleaks.txt`). Files whose stem is not a known
/// tool are skipped with a note.
fn discover_reports(dir: &Path) -> Result<Vec<ToolInput>> {
    let pattern = format!("{}/*", dir.display());
    let mut inputs = Vec::new();
    let mut paths: Vec<PathBuf> = glob::glob(&pattern)
        .context("Failed to read glob pattern")?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    for path in paths {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        match stem.parse::<SourceTool>() {
            Ok(tool) => inputs.push(ToolInput {
                tool,
                path: path.clone(),
            }),
            Err(_) => {
                eprintln!(
                    "{} skipping '{}': not named after a known tool",
                    "note:".dimmed(),
                    path.display()
                );
            }
        }
    }
    Ok(inputs)
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    mut inputs: Vec<ToolInput>,
    reports_dir: Option<&Path>,
    policy_path: Option<&Path>,
    output: Option<&Path>,
    comment: Option<&Path>,
    format: &str,
    jobs: Option<usize>,
    timeout_secs: u64,
    strict: bool,
) -> Result<i32> {
    if let Some(dir) = reports_dir {
        inputs.extend(discover_reports(dir)?);
    }
    if inputs.is_empty() {
        anyhow::bail!(
            "no tool reports to ingest. Pass --input TOOL=PATH or --reports-dir DIR."
        );
    }

    let policy = match policy_path {
        Some(path) => load_policy(path)?,
        None => GatePolicy::default(),
    };

    let mut options = RunnerOptions {
        timeout: Duration::from_secs(timeout_secs),
        mode: if strict { Mode::Strict } else { Mode::Tolerant },
        ..Default::default()
    };
    if let Some(jobs) = jobs {
        options.jobs = jobs;
    }

    // Pipeline abort (SIGINT) cancels in-flight parser tasks.
    let (cancel_tx, cancel_rx) = runner::cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let outcome = runner::run(inputs, options, cancel_rx)
        .await
        .context("strict normalization failed")?;

    let report = aggregate(
        outcome.findings,
        &policy,
        chrono::Utc::now().date_naive(),
        outcome.partial,
        outcome.tool_errors,
        outcome.warnings,
    );

    if let Some(path) = output {
        let json = scangate_core::emit::json::render(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to '{}'", path.display()))?;
    }
    if let Some(path) = comment {
        let markdown = scangate_core::emit::markdown::render(&report);
        std::fs::write(path, markdown)
            .with_context(|| format!("Failed to write comment to '{}'", path.display()))?;
    }

    match format {
        "json" => println!("{}", scangate_core::emit::json::render(&report)?),
        "markdown" => print!("{}", scangate_core::emit::markdown::render(&report)),
        _ => display::print_report(&report),
    }

    Ok(if report.gate_result.passed() { 0 } else { 1 })
}

fn cmd_init_policy(path: &Path) -> Result<i32> {
    if path.exists() {
        anyhow::bail!("'{}' already exists, not overwriting", path.display());
    }
    std::fs::write(path, generate_default_policy())
        .with_context(|| format!("Failed to write policy to '{}'", path.display()))?;
    println!("Starter policy written to {}", path.display());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_arg() {
        let input = parse_input("trivy=reports/trivy.json").unwrap();
        assert_eq!(input.tool, SourceTool::Trivy);
        assert_eq!(input.path, PathBuf::from("reports/trivy.json"));
    }

    #[test]
    fn test_parse_input_rejects_unknown_tool() {
        assert!(parse_input("sonarqube=x.json").is_err());
        assert!(parse_input("no-equals-sign").is_err());
    }

    #[test]
    fn test_discover_reports_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("trivy.json"), "{}").unwrap();
        std::fs::write(dir.path().join("gitleaks.txt"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let inputs = discover_reports(dir.path()).unwrap();
        assert_eq!(inputs.len(), 2);
        assert!(inputs.iter().any(|i| i.tool == SourceTool::Trivy));
        assert!(inputs.iter().any(|i| i.tool == SourceTool::Gitleaks));
    }
}
