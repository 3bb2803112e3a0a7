// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::{DispatchedJob, ProcessOutcome};
use crate::errors::Result;
use crate::exec::RunnerBackend;
use crate::types::{JobStatus, PipelineStatus};

use super::core::CoreRuntime;
use super::{CoreCommand, PipelineEvent};

/// What a finished runtime leaves behind.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Every outcome persisted during the run, in order.
    pub outcomes: Vec<ProcessOutcome>,
    pub pipeline_status: PipelineStatus,
    /// Final status of every job, in declaration order.
    pub statuses: Vec<(String, JobStatus)>,
}

impl RunSummary {
    pub fn status_of(&self, job: &str) -> Option<JobStatus> {
        self.statuses
            .iter()
            .find(|(name, _)| name == job)
            .map(|(_, status)| *status)
    }
}

/// Feeds [`PipelineEvent`]s into the pipeline core one at a time and
/// delegates job execution to a [`RunnerBackend`].
///
/// All pipeline semantics live in [`CoreRuntime`]; this shell only reads
/// the channel, keeps the journal of outcomes and talks to the runner.
/// Because every event goes through one receiver, triggers for a pipeline
/// are serialized.
pub struct Runtime<R: RunnerBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<PipelineEvent>,
    runner: R,
    journal: Vec<ProcessOutcome>,
}

impl<R: RunnerBackend> fmt::Debug for Runtime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("journal", &self.journal.len())
            .finish_non_exhaustive()
    }
}

impl<R: RunnerBackend> Runtime<R> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<PipelineEvent>, runner: R) -> Self {
        Self {
            core,
            event_rx,
            runner,
            journal: Vec::new(),
        }
    }

    /// Main event loop.
    ///
    /// Runs until the core asks to stop, or until every sender is gone.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!("stagegate runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        let processor = self.core.into_processor();
        let summary = RunSummary {
            outcomes: self.journal,
            pipeline_status: processor.pipeline_status(),
            statuses: processor
                .pipeline()
                .jobs()
                .iter()
                .map(|j| (j.name.clone(), j.status))
                .collect(),
        };

        info!(pipeline = %summary.pipeline_status, "runtime exiting");
        Ok(summary)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Persist(outcome) => {
                for update in outcome.status_updates.iter() {
                    info!(
                        job = %update.name,
                        id = %update.job_id,
                        from = %update.from,
                        to = %update.to,
                        "job status updated"
                    );
                }
                for update in outcome.deployment_updates.iter() {
                    info!(
                        deployment = %update.deployment_id,
                        environment = %update.environment,
                        from = %update.from,
                        to = %update.to,
                        "deployment status updated"
                    );
                }
                self.journal.push(outcome);
            }
            CoreCommand::DispatchJobs(jobs) => {
                self.dispatch(jobs).await?;
            }
            CoreCommand::RequestExit => {
                // keep_running is already false alongside this command.
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, jobs: Vec<DispatchedJob>) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = jobs.iter().map(|j| j.name.as_str()).collect();
        debug!(?names, "dispatching jobs to runner");

        self.runner.dispatch_jobs(jobs).await
    }
}
