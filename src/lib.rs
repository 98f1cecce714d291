// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::DependencyGraph;
use crate::engine::runtime::SessionOptions;
use crate::engine::{run_generation, RunRequest, Runtime, RuntimeEvent};
use crate::exec::{CommandGenerator, OutputGenerator, OutputWriter};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::path_utils::resolve_against;
use crate::watch::{NotifyWatchService, WatchPlan};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the dependency graph (cycles abort here)
/// - one generation run over every output
/// - (optional) the watch session, with Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = resolve_cwd(args.cwd.as_deref())?;
    let options = SessionOptions {
        config_path: resolve_against(&cwd, Path::new(&args.config)),
        cwd: cwd.clone(),
        concurrency_override: args.concurrency,
    };

    let mut cfg = load_and_validate(&options.config_path)
        .with_context(|| format!("loading config {:?}", options.config_path))?;
    options.apply_overrides(&mut cfg);

    let graph = DependencyGraph::build(cfg.generates(), &cwd)?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    if args.dry_run {
        print_dry_run(&cfg, &graph, &cwd, fs.as_ref())?;
        return Ok(());
    }

    let generator: Arc<dyn OutputGenerator> = Arc::new(CommandGenerator::new());
    let config = Arc::new(cfg);
    let report = run_generation(
        RunRequest::all(Arc::clone(&config), cwd.clone()),
        Arc::clone(&generator),
        OutputWriter::new(Arc::clone(&fs)),
    )
    .await?;
    report.log_summary();

    let watch = args.watch || config.watch().is_enabled();
    if !watch {
        let failed = report.failed();
        if !failed.is_empty() {
            bail!("failed to generate {}", failed.join(", "));
        }
        return Ok(());
    }

    let config = Arc::try_unwrap(config).unwrap_or_else(|shared| (*shared).clone());
    let runtime = Runtime::new(
        config,
        options,
        generator,
        fs,
        Arc::new(NotifyWatchService::new(&cwd)),
    );

    // Ctrl-C → graceful shutdown.
    {
        let tx = runtime.event_sender();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested);
        });
    }

    runtime.run().await
}

fn resolve_cwd(cli_cwd: Option<&str>) -> Result<PathBuf> {
    let process_cwd = std::env::current_dir().context("reading current directory")?;
    let cwd = match cli_cwd {
        Some(dir) => resolve_against(&process_cwd, Path::new(dir)),
        None => process_cwd,
    };
    debug!(cwd = %cwd.display(), "resolved working directory");
    Ok(cwd)
}

/// Dry-run output: generation order, dependencies and the watch plan.
fn print_dry_run(
    cfg: &ConfigFile,
    graph: &DependencyGraph,
    cwd: &Path,
    fs: &dyn FileSystem,
) -> Result<()> {
    println!("gendag dry-run");
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config_section().triggered_while_running_behaviour
    );
    println!("  config.concurrency = {}", cfg.config_section().concurrency);
    println!();

    let order = graph.overall_order();
    println!("generation order ({}):", order.len());
    for output in &order {
        println!("  - {output}");
        let deps = graph.direct_dependencies_of(output)?;
        if !deps.is_empty() {
            println!("      after: {:?}", deps);
        }
        let target = graph.node(output)?.target();
        if let Some(ref cmd) = target.cmd {
            println!("      cmd: {cmd}");
        }
        if let Some(ref preset) = target.preset {
            println!("      preset: {preset}");
        }
    }
    println!();

    let plan = WatchPlan::from_config(cfg, cwd, fs)?;
    println!("watch directory: {}", plan.directory.display());
    if !plan.options.ignore.is_empty() {
        println!("  ignore: {:?}", plan.options.ignore);
    }
    println!("  ignore_globs: {:?}", plan.options.ignore_globs);

    info!("dry-run complete (no generation)");
    Ok(())
}
