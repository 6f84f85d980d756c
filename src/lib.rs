// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{from_env, validate_stages};
use crate::engine::PipelineOrchestrator;
use crate::exec::ForkLauncher;
use crate::types::Stage;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution (`--pager`, `PAGER`, filter patterns)
/// - the stage list
/// - the orchestrator with the fork launcher
/// - Ctrl-C handling
///
/// Returns the process exit status: `0` when every stage exited normally,
/// [`types::ABNORMAL_EXIT_CODE`] when any stage was killed by a signal.
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = from_env(&args).context("resolving pipeline configuration")?;
    let stages = cfg.stages();
    validate_stages(&stages)?;

    if args.dry_run {
        print_dry_run(&stages);
        return Ok(0);
    }

    // The terminal delivers Ctrl-C to every stage as well. Keep the
    // orchestrator alive so it can still reap them and report status. The
    // handler is installed here, before any stage exists.
    let mut interrupts =
        signal(SignalKind::interrupt()).context("installing interrupt handler")?;
    tokio::spawn(async move {
        while interrupts.recv().await.is_some() {
            info!("interrupt received; waiting for stages to finish");
        }
    });

    info!(stages = stages.len(), pager = %cfg.pager(), "starting pipeline");

    let mut orchestrator = PipelineOrchestrator::new(ForkLauncher::new());
    let result = orchestrator
        .run(&stages)
        .await
        .context("running pipeline")?;

    debug!(state = ?orchestrator.state(), "orchestrator finished");
    Ok(result.aggregate_exit_code)
}

/// Dry-run output: one line per stage, in pipe order.
fn print_dry_run(stages: &[Stage]) {
    println!("digenv dry-run");
    println!("stages ({}):", stages.len());
    for (index, stage) in stages.iter().enumerate() {
        println!("  {index}: {stage}");
    }

    debug!("dry-run complete (no execution)");
}
