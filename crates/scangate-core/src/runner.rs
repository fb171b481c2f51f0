//! The parse phase: N independent tool outputs ingested concurrently,
//! then a join barrier before single-threaded aggregation.
//!
//! Each input gets its own task, bounded by a semaphore sized to the
//! configured job count. Per-tool failures (unreadable file, malformed
//! output, timeout) are isolated: the tool contributes nothing, the run
//! is marked partial, and everything else proceeds. Correctness does
//! not depend on completion order — the correlator is commutative.

use crate::error::{NormalizeError, ParseError};
use crate::finding::{Finding, SourceTool};
use crate::normalize::{self, Mode};
use crate::parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

/// One tool's output artifact to ingest.
#[derive(Debug, Clone)]
pub struct ToolInput {
    pub tool: SourceTool,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Parser parallelism. Defaults to the available core count.
    pub jobs: usize,
    /// Per-tool parse timeout.
    pub timeout: Duration,
    pub mode: Mode,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        RunnerOptions {
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            timeout: Duration::from_secs(60),
            mode: Mode::Tolerant,
        }
    }
}

/// What the parse phase produced, ready for aggregation.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub findings: Vec<Finding>,
    /// Tool label -> why it contributed nothing.
    pub tool_errors: BTreeMap<String, String>,
    pub warnings: Vec<String>,
    /// True when any tool failed, timed out, or was cancelled.
    pub partial: bool,
}

enum TaskResult {
    Parsed(Vec<Finding>, Vec<String>),
    Recovered(ParseError),
    Fatal(NormalizeError),
    Cancelled,
}

/// Create a cancellation pair for [`run`]. Flip the sender to `true`
/// to cancel in-flight parser tasks.
pub fn cancellation() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Ingest all inputs concurrently and join.
///
/// Only a strict-mode normalization failure is returned as an error;
/// every per-tool problem is folded into the outcome instead.
pub async fn run(
    inputs: Vec<ToolInput>,
    options: RunnerOptions,
    cancel: watch::Receiver<bool>,
) -> Result<RunOutcome, NormalizeError> {
    let semaphore = Arc::new(Semaphore::new(options.jobs.max(1)));
    let mut tasks: JoinSet<(SourceTool, TaskResult)> = JoinSet::new();

    for input in inputs {
        let semaphore = Arc::clone(&semaphore);
        let mut cancel = cancel.clone();
        let timeout = options.timeout;
        let mode = options.mode;

        tasks.spawn(async move {
            let tool = input.tool;
            if *cancel.borrow() {
                return (tool, TaskResult::Cancelled);
            }
            let Ok(_permit) = semaphore.acquire().await else {
                return (tool, TaskResult::Cancelled);
            };

            let work = ingest(input, mode);
            tokio::select! {
                // A dropped sender reads as cancellation; callers hold
                // the sender for the lifetime of the run.
                _ = cancel.changed() => (tool, TaskResult::Cancelled),
                result = tokio::time::timeout(timeout, work) => match result {
                    Ok(task_result) => (tool, task_result),
                    Err(_) => (
                        tool,
                        TaskResult::Recovered(ParseError::Timeout {
                            tool,
                            seconds: timeout.as_secs(),
                        }),
                    ),
                },
            }
        });
    }

    let mut outcome = RunOutcome::default();

    while let Some(joined) = tasks.join_next().await {
        let (tool, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                outcome.partial = true;
                outcome
                    .warnings
                    .push(format!("parser task panicked: {}", e));
                continue;
            }
        };
        match result {
            TaskResult::Parsed(findings, warnings) => {
                outcome.findings.extend(findings);
                outcome.warnings.extend(warnings);
            }
            TaskResult::Recovered(err) => {
                outcome.partial = true;
                outcome.warnings.push(err.to_string());
                outcome.tool_errors.insert(tool.label().to_string(), err.to_string());
            }
            TaskResult::Fatal(err) => return Err(err),
            TaskResult::Cancelled => {
                outcome.partial = true;
                outcome
                    .tool_errors
                    .insert(tool.label().to_string(), "cancelled before completion".to_string());
            }
        }
    }

    Ok(outcome)
}

async fn ingest(input: ToolInput, mode: Mode) -> TaskResult {
    let raw = match tokio::fs::read_to_string(&input.path).await {
        Ok(raw) => raw,
        Err(e) => {
            return TaskResult::Recovered(ParseError::Malformed {
                tool: input.tool,
                detail: format!("cannot read '{}': {}", input.path.display(), e),
            })
        }
    };
    let raws = match parser::parse(input.tool, &raw) {
        Ok(raws) => raws,
        Err(e) => return TaskResult::Recovered(e),
    };
    match normalize::normalize_all(raws, mode) {
        Ok((findings, warnings)) => TaskResult::Parsed(findings, warnings),
        Err(e) => TaskResult::Fatal(e),
    }
}
