// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`PipelineEvent`]s one at a time and produces an
//! updated pipeline state plus a list of commands for the IO shell
//! (`engine::runtime::Runtime`), which owns the channel, the runner and
//! signal handling.
//!
//! It holds no channels and no Tokio types, so it can be stepped directly
//! in tests.

use std::collections::HashSet;

use crate::dag::PipelineProcessor;
use crate::engine::event_handlers::{
    CoreStep, handle_approvals, handle_cancel, handle_job_finished, handle_job_played,
    handle_job_started, handle_process,
};
use crate::engine::{JobName, PipelineEvent, RuntimeOptions};

#[derive(Debug)]
pub struct CoreRuntime {
    processor: PipelineProcessor,
    /// Jobs already handed to the runner; never dispatched twice.
    dispatched: HashSet<JobName>,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(processor: PipelineProcessor, options: RuntimeOptions) -> Self {
        Self {
            processor,
            dispatched: HashSet::new(),
            options,
        }
    }

    pub fn processor(&self) -> &PipelineProcessor {
        &self.processor
    }

    pub fn into_processor(self) -> PipelineProcessor {
        self.processor
    }

    /// Expose whether the pipeline is settled (for tests).
    pub fn is_settled(&self) -> bool {
        self.processor.is_settled()
    }

    pub fn was_dispatched(&self, job: &str) -> bool {
        self.dispatched.contains(job)
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: PipelineEvent) -> CoreStep {
        let processor = &mut self.processor;
        let dispatched = &mut self.dispatched;
        let options = &self.options;

        match event {
            PipelineEvent::Process => handle_process(processor, dispatched, options),
            PipelineEvent::JobStarted { job } => {
                handle_job_started(processor, dispatched, options, job)
            }
            PipelineEvent::JobFinished { job, outcome } => {
                handle_job_finished(processor, dispatched, options, job, outcome)
            }
            PipelineEvent::JobPlayed { job } => {
                handle_job_played(processor, dispatched, options, job)
            }
            PipelineEvent::ApprovalsUpdated {
                environment,
                access_level,
                approvals,
            } => handle_approvals(
                processor,
                dispatched,
                options,
                &environment,
                access_level,
                approvals,
            ),
            PipelineEvent::CancelRequested => handle_cancel(processor),
            PipelineEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
