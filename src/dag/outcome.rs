// src/dag/outcome.rs

//! Result of one processing step: the patch set the caller persists.

use crate::dag::approval::{ApprovalGates, DeploymentId};
use crate::dag::job::JobId;
use crate::dag::pipeline::Pipeline;
use crate::types::{DeploymentStatus, JobStatus, PipelineStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub job_id: JobId,
    pub name: String,
    pub from: JobStatus,
    pub to: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentUpdate {
    pub deployment_id: DeploymentId,
    pub environment: String,
    pub from: DeploymentStatus,
    pub to: DeploymentStatus,
}

/// Updates produced by a single event, ordered by stage and then by
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub status_updates: Vec<StatusUpdate>,
    pub deployment_updates: Vec<DeploymentUpdate>,
    pub pipeline_status: PipelineStatus,
    /// Propagation passes that changed something.
    pub passes: usize,
}

impl ProcessOutcome {
    pub fn is_empty(&self) -> bool {
        self.status_updates.is_empty() && self.deployment_updates.is_empty()
    }

    /// New status of the named job, if this outcome changed it.
    pub fn status_of(&self, name: &str) -> Option<JobStatus> {
        self.status_updates
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.to)
    }
}

/// Aggregate status of the whole pipeline.
///
/// Anything pending or running makes the pipeline `running`. Once nothing
/// is active, a canceled job makes it `canceled`, and a job waiting on a
/// manual action or an approval (or a created job stuck behind one) makes
/// it `blocked`. Blocking failures give `failed`; a pipeline of only
/// skipped jobs is `skipped`.
pub fn aggregate_status(
    pipeline: &Pipeline,
    statuses: &[JobStatus],
    gates: &ApprovalGates<'_>,
) -> PipelineStatus {
    if statuses.iter().all(|s| *s == JobStatus::Created) {
        return PipelineStatus::Created;
    }
    if statuses.iter().any(|s| s.is_active()) {
        return PipelineStatus::Running;
    }

    let jobs = pipeline.jobs();
    let waiting = statuses.iter().enumerate().any(|(idx, status)| match status {
        JobStatus::Created => true,
        JobStatus::Manual => !jobs[idx].allow_failure || gates.is_held(idx),
        JobStatus::Success => gates.is_held(idx),
        _ => false,
    });
    if statuses.contains(&JobStatus::Canceled) {
        return PipelineStatus::Canceled;
    }
    if waiting {
        return PipelineStatus::Blocked;
    }
    if statuses
        .iter()
        .enumerate()
        .any(|(idx, s)| *s == JobStatus::Failed && !jobs[idx].allow_failure)
    {
        return PipelineStatus::Failed;
    }
    if statuses.iter().all(|s| *s == JobStatus::Skipped) {
        return PipelineStatus::Skipped;
    }

    PipelineStatus::Success
}
