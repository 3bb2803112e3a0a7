// src/engine/mod.rs

//! Event-driven processing of a single pipeline.
//!
//! The pure core state machine lives in [`core`]; the async shell that
//! serializes events through a channel and talks to a runner is
//! implemented in [`runtime`].

use crate::types::AccessLevel;

/// Canonical job name type used throughout the engine.
pub type JobName = String;

/// Result of a job as reported by a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Exit once no job is pending or running (used by `--simulate`).
    pub exit_when_settled: bool,
}

/// Events flowing into the runtime from runners, users and signals.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Reprocess the pipeline without any other change.
    Process,
    /// A runner picked up a job.
    JobStarted { job: JobName },
    /// A runner finished a job.
    JobFinished { job: JobName, outcome: JobOutcome },
    /// A user played a manual job.
    JobPlayed { job: JobName },
    /// Approval counts of an environment changed.
    ApprovalsUpdated {
        environment: String,
        access_level: AccessLevel,
        approvals: u32,
    },
    /// Cancel every non-terminal job.
    CancelRequested,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{RunSummary, Runtime};
