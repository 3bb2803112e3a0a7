// src/dag/job.rs

//! Job node model.

use std::fmt;

use crate::types::{JobKind, JobStatus, PolicyScope, When};

/// Position of a job inside [`crate::dag::Pipeline::jobs`]. Used as the node
/// id of the dependency graph.
pub type JobIndex = usize;

/// Stable job identifier reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The `needs` declaration of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Needs {
    /// No `needs` key: the job is sequenced by stage.
    Stage,
    /// `needs = [...]`, possibly empty.
    Explicit(Vec<String>),
}

/// Where a job definition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    Project,
    Policy { source: String, scope: PolicyScope },
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub stage: String,
    /// Index of `stage` in the pipeline's [`crate::dag::StageIndex`].
    pub stage_idx: usize,
    pub kind: JobKind,
    pub status: JobStatus,
    pub when: When,
    pub allow_failure: bool,
    pub needs: Needs,
    /// Target environment of a deployment-class job.
    pub environment: Option<String>,
    pub source: JobSource,
}

impl Job {
    /// DAG jobs declare `needs` (even an empty list) and bypass stage
    /// sequencing.
    pub fn is_dag_job(&self) -> bool {
        matches!(self.needs, Needs::Explicit(_))
    }

    pub fn explicit_needs(&self) -> &[String] {
        match &self.needs {
            Needs::Explicit(names) => names,
            Needs::Stage => &[],
        }
    }

    /// Failed without `allow_failure`, or canceled.
    pub fn is_failed_blocking(&self, status: JobStatus) -> bool {
        match status {
            JobStatus::Failed => !self.allow_failure,
            JobStatus::Canceled => true,
            _ => false,
        }
    }
}

/// A job handed to a runner because it just became pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedJob {
    pub id: JobId,
    pub name: String,
    pub kind: JobKind,
    pub environment: Option<String>,
}

impl DispatchedJob {
    pub fn from_job(job: &Job) -> Self {
        Self {
            id: job.id,
            name: job.name.clone(),
            kind: job.kind,
            environment: job.environment.clone(),
        }
    }
}
