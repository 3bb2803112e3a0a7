// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::PipelineSnapshot;
use crate::dag::{PipelineProcessor, ProcessOutcome};
use crate::engine::{CoreRuntime, PipelineEvent, RunSummary, Runtime, RuntimeOptions};
use crate::exec::SimulatedRunner;

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the snapshot, assembles the pipeline, then either
/// prints it (`--dry-run`), cancels it (`--cancel`), drives it to
/// settlement with the simulated runner (`--simulate`), or runs a single
/// processing step.
pub async fn run(args: CliArgs) -> Result<()> {
    let path = PathBuf::from(&args.pipeline);
    let snapshot = load_and_validate(&path)?;
    let mut processor = PipelineProcessor::from_snapshot(&snapshot)?;

    if args.dry_run {
        print_dry_run(&processor);
        return Ok(());
    }

    if args.cancel {
        let outcome = processor.cancel();
        print_outcome(&outcome);
        return Ok(());
    }

    if !args.simulate {
        let outcome = processor.process();
        print_outcome(&outcome);
        return Ok(());
    }

    let (rt_tx, rt_rx) = mpsc::channel::<PipelineEvent>(64);

    let failing: HashSet<String> = args.fail.iter().cloned().collect();
    let runner = SimulatedRunner::new(
        rt_tx.clone(),
        failing,
        Duration::from_millis(args.job_delay_ms),
    );

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(PipelineEvent::ShutdownRequested).await;
        });
    }

    rt_tx.send(PipelineEvent::Process).await?;

    let options = RuntimeOptions {
        exit_when_settled: true,
    };
    let core = CoreRuntime::new(processor, options);
    let runtime = Runtime::new(core, rt_rx, runner);
    let summary = runtime.run().await?;

    print_summary(&summary);
    Ok(())
}

/// Assemble and process a snapshot once, without any runtime.
pub fn process_snapshot(snapshot: &PipelineSnapshot) -> errors::Result<ProcessOutcome> {
    let mut processor = PipelineProcessor::from_snapshot(snapshot)?;
    Ok(processor.process())
}

fn print_outcome(outcome: &ProcessOutcome) {
    if outcome.is_empty() {
        println!("no changes");
    }
    for update in outcome.status_updates.iter() {
        println!(
            "job {} ({}): {} -> {}",
            update.name, update.job_id, update.from, update.to
        );
    }
    for update in outcome.deployment_updates.iter() {
        println!(
            "{} ({}): {} -> {}",
            update.deployment_id, update.environment, update.from, update.to
        );
    }
    println!("pipeline: {}", outcome.pipeline_status);
}

fn print_summary(summary: &RunSummary) {
    info!(steps = summary.outcomes.len(), "simulation finished");
    for (name, status) in summary.statuses.iter() {
        println!("{name}: {status}");
    }
    println!("pipeline: {}", summary.pipeline_status);
}

/// Dry-run output: stages with their jobs, then the dependency edges.
fn print_dry_run(processor: &PipelineProcessor) {
    let pipeline = processor.pipeline();
    let config = processor.config();

    println!("stagegate dry-run");
    println!("  config.approvals_enabled = {}", config.approvals_enabled);
    println!("  config.policies_enabled = {}", config.policies_enabled);
    println!("  config.strict_post_stage = {}", config.strict_post_stage);
    println!(
        "  config.dag_jobs_wait_for_policy_pre = {}",
        config.dag_jobs_wait_for_policy_pre
    );
    println!();

    println!("stages ({}):", pipeline.stages().order().len());
    for stage in pipeline.stages().order() {
        let jobs = pipeline.stages().jobs_in(&stage.name);
        println!("  - {} ({} jobs)", stage.name, jobs.len());
        for &idx in jobs {
            let job = &pipeline.jobs()[idx];
            println!("      {} {} [{}]", job.id, job.name, job.status);
            if let crate::dag::JobSource::Policy { source, scope } = &job.source {
                println!("          policy: {source} ({scope:?})");
            }
            if job.is_dag_job() {
                println!("          needs: {:?}", job.explicit_needs());
            }
            if let Some(env) = job.environment.as_deref() {
                println!("          environment: {env}");
            }
        }
    }
    println!();

    println!("edges ({}):", processor.graph().edge_count());
    for (job, dep) in processor.graph().edges() {
        println!(
            "  {} -> {}",
            pipeline.jobs()[dep].name,
            pipeline.jobs()[job].name
        );
    }

    debug!("dry-run complete (no processing)");
}
