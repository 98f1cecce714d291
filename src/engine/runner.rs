// src/engine/runner.rs

//! One generation run over the output dependency graph.
//!
//! Every selected output gets its own task. A task first waits for its
//! dependencies, then takes a concurrency permit, then generates and writes
//! its output and finally settles its completion signal. Taking the permit
//! after the wait keeps waiting outputs from starving their producers.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::{wait_for_dependencies, DependencyGraph};
use crate::errors::{CodegenError, Result};
use crate::exec::{GenerationRequest, OutputGenerator, OutputWriter, WriteOutcome};

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub config: Arc<ConfigFile>,
    pub cwd: PathBuf,
    /// `None` regenerates every output.
    pub selection: Option<Vec<String>>,
    pub concurrency: usize,
}

impl RunRequest {
    pub fn all(config: Arc<ConfigFile>, cwd: impl Into<PathBuf>) -> Self {
        let concurrency = config.config_section().concurrency;
        Self {
            config,
            cwd: cwd.into(),
            selection: None,
            concurrency,
        }
    }

    pub fn with_selection(mut self, selection: Option<Vec<String>>) -> Self {
        self.selection = selection;
        self
    }
}

/// Result for one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputStatus {
    Written,
    Unchanged,
    /// A preset target ran; its command owns the files it writes.
    Generated,
    /// Not selected in this run.
    Skipped,
    Failed(String),
    /// Not attempted because a dependency failed.
    Blocked { dependency: String },
}

impl OutputStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, OutputStatus::Failed(_) | OutputStatus::Blocked { .. })
    }
}

/// Per-output results in overall order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outputs: Vec<(String, OutputStatus)>,
}

impl RunReport {
    pub fn status(&self, output: &str) -> Option<&OutputStatus> {
        self.outputs
            .iter()
            .find(|(name, _)| name == output)
            .map(|(_, status)| status)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.outputs
            .iter()
            .filter(|(_, status)| status.is_failure())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }

    pub fn log_summary(&self) {
        for (output, status) in &self.outputs {
            match status {
                OutputStatus::Failed(reason) => {
                    error!(output = %output, reason = %reason, "output failed")
                }
                OutputStatus::Blocked { dependency } => {
                    warn!(output = %output, dependency = %dependency, "output blocked by failed dependency")
                }
                other => debug!(output = %output, status = ?other, "output finished"),
            }
        }
        let count = |f: fn(&OutputStatus) -> bool| self.outputs.iter().filter(|(_, s)| f(s)).count();
        info!(
            written = count(|s| matches!(s, OutputStatus::Written | OutputStatus::Generated)),
            unchanged = count(|s| matches!(s, OutputStatus::Unchanged)),
            skipped = count(|s| matches!(s, OutputStatus::Skipped)),
            failed = count(OutputStatus::is_failure),
            "generation run finished"
        );
    }
}

/// Selected outputs plus everything that depends on them.
fn close_over_dependents(graph: &DependencyGraph, selection: &[String]) -> Result<HashSet<String>> {
    let mut selected = HashSet::new();
    for output in selection {
        let node = graph.node(output)?;
        selected.insert(node.output().to_string());
        selected.extend(graph.dependents_of(output)?);
    }
    Ok(selected)
}

/// Run generation for the requested outputs.
///
/// Fails only for problems with the run as a whole (cycles, unknown
/// selected outputs). Per-output failures are reported in the [`RunReport`].
pub async fn run_generation(
    request: RunRequest,
    generator: Arc<dyn OutputGenerator>,
    writer: OutputWriter,
) -> Result<RunReport> {
    let graph = Arc::new(DependencyGraph::build(
        request.config.generates(),
        &request.cwd,
    )?);
    let order = graph.overall_order();

    let selected = match &request.selection {
        Some(selection) => close_over_dependents(&graph, selection)?,
        None => order.iter().cloned().collect(),
    };

    info!(
        outputs = selected.len(),
        total = order.len(),
        concurrency = request.concurrency,
        "starting generation run"
    );

    let semaphore = Arc::new(Semaphore::new(request.concurrency.max(1)));
    // Dropping the set aborts every task still running.
    let mut tasks = JoinSet::new();

    for output in &order {
        if !selected.contains(output) {
            graph.node(output)?.success();
            continue;
        }

        let graph = Arc::clone(&graph);
        let semaphore = Arc::clone(&semaphore);
        let generator = Arc::clone(&generator);
        let writer = writer.clone();
        let config = Arc::clone(&request.config);
        let cwd = request.cwd.clone();
        let output = output.clone();

        tasks.spawn(async move {
            let status =
                generate_one(&graph, &output, &semaphore, generator.as_ref(), &writer, &config, &cwd)
                    .await;
            (output, status)
        });
    }

    let mut statuses: HashMap<String, OutputStatus> = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((output, status)) => {
                statuses.insert(output, status);
            }
            Err(err) => error!(error = %err, "generation task ended unexpectedly"),
        }
    }

    let outputs = order
        .into_iter()
        .map(|output| {
            let status = if !selected.contains(&output) {
                OutputStatus::Skipped
            } else {
                statuses
                    .remove(&output)
                    .unwrap_or_else(|| OutputStatus::Failed("generation task ended unexpectedly".to_string()))
            };
            (output, status)
        })
        .collect();

    Ok(RunReport { outputs })
}

async fn generate_one(
    graph: &DependencyGraph,
    output: &str,
    semaphore: &Semaphore,
    generator: &dyn OutputGenerator,
    writer: &OutputWriter,
    config: &ConfigFile,
    cwd: &std::path::Path,
) -> OutputStatus {
    let node = match graph.node(output) {
        Ok(node) => node,
        Err(err) => return OutputStatus::Failed(err.to_string()),
    };

    if let Err(err) = wait_for_dependencies(graph, output).await {
        let dependency = match &err {
            CodegenError::DependencyFailed { dependency, .. } => dependency.clone(),
            _ => String::new(),
        };
        warn!(output = %output, error = %err, "skipping output");
        node.fail(err.into());
        return OutputStatus::Blocked { dependency };
    }

    let _permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(err) => {
            node.fail(err.into());
            return OutputStatus::Failed("concurrency limiter closed".to_string());
        }
    };

    let request = GenerationRequest::for_target(config, node.target(), cwd);
    let result = match generator.generate(&request).await {
        Ok(_) if request.is_preset() => Ok(OutputStatus::Generated),
        Ok(text) => writer
            .write(&request.output_path, &text)
            .map(|outcome| match outcome {
                WriteOutcome::Written => OutputStatus::Written,
                WriteOutcome::Unchanged => OutputStatus::Unchanged,
            }),
        Err(err) => Err(err),
    };

    match result {
        Ok(status) => {
            debug!(output = %output, ?status, "output generated");
            node.success();
            status
        }
        Err(err) => {
            let reason = format!("{err:#}");
            error!(output = %output, error = %reason, "failed to generate output");
            node.fail(err);
            OutputStatus::Failed(reason)
        }
    }
}
