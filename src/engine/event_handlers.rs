// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::HashSet;

use tracing::debug;

use crate::dag::{DispatchedJob, PipelineProcessor, ProcessOutcome};
use crate::engine::{JobName, JobOutcome, RuntimeOptions};
use crate::types::AccessLevel;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand these updates to whoever persists pipeline state.
    Persist(ProcessOutcome),
    /// Send these jobs to the runner.
    DispatchJobs(Vec<DispatchedJob>),
    /// Request that the process exits (pipeline settled).
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    /// Outcomes carried by this step.
    pub fn outcomes(&self) -> impl Iterator<Item = &ProcessOutcome> {
        self.commands.iter().filter_map(|c| match c {
            CoreCommand::Persist(outcome) => Some(outcome),
            _ => None,
        })
    }

    /// Jobs dispatched by this step.
    pub fn dispatched(&self) -> impl Iterator<Item = &DispatchedJob> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchJobs(jobs) => Some(jobs.iter()),
                _ => None,
            })
            .flatten()
    }

    pub fn requests_exit(&self) -> bool {
        self.commands
            .iter()
            .any(|c| matches!(c, CoreCommand::RequestExit))
    }
}

/// Plain reprocessing, used to seed a run.
pub fn handle_process(
    processor: &mut PipelineProcessor,
    dispatched: &mut HashSet<JobName>,
    options: &RuntimeOptions,
) -> CoreStep {
    let outcome = processor.process();
    finish_step(processor, dispatched, options, outcome)
}

pub fn handle_job_started(
    processor: &mut PipelineProcessor,
    dispatched: &mut HashSet<JobName>,
    options: &RuntimeOptions,
    job: JobName,
) -> CoreStep {
    let outcome = processor.job_started(&job);
    finish_step(processor, dispatched, options, outcome)
}

pub fn handle_job_finished(
    processor: &mut PipelineProcessor,
    dispatched: &mut HashSet<JobName>,
    options: &RuntimeOptions,
    job: JobName,
    outcome: JobOutcome,
) -> CoreStep {
    let outcome = processor.job_finished(&job, outcome);
    finish_step(processor, dispatched, options, outcome)
}

pub fn handle_job_played(
    processor: &mut PipelineProcessor,
    dispatched: &mut HashSet<JobName>,
    options: &RuntimeOptions,
    job: JobName,
) -> CoreStep {
    let outcome = processor.play(&job);
    finish_step(processor, dispatched, options, outcome)
}

pub fn handle_approvals(
    processor: &mut PipelineProcessor,
    dispatched: &mut HashSet<JobName>,
    options: &RuntimeOptions,
    environment: &str,
    access_level: AccessLevel,
    approvals: u32,
) -> CoreStep {
    let outcome = processor.record_approvals(environment, access_level, approvals);
    finish_step(processor, dispatched, options, outcome)
}

/// Cancellation always ends the run: nothing can become pending again.
pub fn handle_cancel(processor: &mut PipelineProcessor) -> CoreStep {
    let outcome = processor.cancel();
    let mut commands = Vec::new();
    if !outcome.is_empty() {
        commands.push(CoreCommand::Persist(outcome));
    }
    commands.push(CoreCommand::RequestExit);

    CoreStep {
        commands,
        keep_running: false,
    }
}

/// Turn an outcome into commands: persist it, dispatch every pending job
/// the runner has not seen yet, and exit if the pipeline settled.
fn finish_step(
    processor: &PipelineProcessor,
    dispatched: &mut HashSet<JobName>,
    options: &RuntimeOptions,
    outcome: ProcessOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    if !outcome.is_empty() {
        commands.push(CoreCommand::Persist(outcome));
    }

    let ready: Vec<DispatchedJob> = processor
        .pending_jobs()
        .into_iter()
        .filter(|job| dispatched.insert(job.name.clone()))
        .collect();
    if !ready.is_empty() {
        debug!(count = ready.len(), "dispatching newly pending jobs");
        commands.push(CoreCommand::DispatchJobs(ready));
    }

    let mut keep_running = true;
    if options.exit_when_settled && processor.is_settled() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
