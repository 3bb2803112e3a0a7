// src/dag/propagation.rs

//! Status propagation engine.
//!
//! Each pass evaluates every job against the statuses of the *previous*
//! pass and commits all transitions at once, so the order in which jobs are
//! evaluated never changes the result. Passes repeat until nothing moves.
//!
//! Transitions only go forward (`created -> pending | manual | skipped`,
//! approval-held `manual -> pending`), which bounds the number of passes by
//! the number of jobs.

use tracing::{debug, trace};

use crate::config::model::EngineConfig;
use crate::dag::approval::ApprovalGates;
use crate::dag::graph::DependencyGraph;
use crate::dag::job::{Job, JobIndex, Needs};
use crate::dag::pipeline::Pipeline;
use crate::dag::stage::Stage;
use crate::types::{JobKind, JobStatus, When};

/// Composite state of everything a job waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Passed,
    /// Something failed and everything else is resolved.
    Failed,
    /// Something failed while other jobs are still unresolved.
    Failing,
    Incomplete,
}

impl Upstream {
    /// A failure next to unresolved jobs gives `Failing`, which callers
    /// treat like `Incomplete`.
    pub fn combine(self, other: Upstream) -> Upstream {
        use Upstream::*;
        match (self, other) {
            (Passed, x) | (x, Passed) => x,
            (Failed, Failed) => Failed,
            (Incomplete, Incomplete) => Incomplete,
            _ => Failing,
        }
    }
}

pub struct Propagator<'a> {
    config: &'a EngineConfig,
    pipeline: &'a Pipeline,
    graph: &'a DependencyGraph,
    gates: ApprovalGates<'a>,
}

impl<'a> Propagator<'a> {
    pub fn new(config: &'a EngineConfig, pipeline: &'a Pipeline, graph: &'a DependencyGraph) -> Self {
        Self {
            config,
            pipeline,
            graph,
            gates: ApprovalGates::new(config.approvals_enabled, pipeline),
        }
    }

    /// State of `dep` as seen through an explicit `needs` edge.
    ///
    /// Manual jobs never pass an edge, optional or not: a job that needs a
    /// manual job waits for it to be played.
    fn edge_state(&self, statuses: &[JobStatus], dep: JobIndex) -> Upstream {
        let job = &self.pipeline.jobs()[dep];
        let status = statuses[dep];

        if job.is_failed_blocking(status) {
            return Upstream::Failed;
        }

        match status {
            JobStatus::Skipped | JobStatus::Failed => Upstream::Passed,
            JobStatus::Success if self.gates.is_held(dep) => Upstream::Incomplete,
            JobStatus::Success => Upstream::Passed,
            _ => Upstream::Incomplete,
        }
    }

    /// State of a job as seen by the stage-completion rule. Optional manual
    /// jobs count as complete.
    fn stage_member_state(&self, statuses: &[JobStatus], idx: JobIndex) -> Upstream {
        let job = &self.pipeline.jobs()[idx];
        if statuses[idx] == JobStatus::Manual && job.allow_failure && !self.gates.is_held(idx) {
            return Upstream::Passed;
        }
        self.edge_state(statuses, idx)
    }

    /// Composite of every job in `stages`.
    pub fn stages_state(&self, statuses: &[JobStatus], stages: &[Stage]) -> Upstream {
        stages
            .iter()
            .flat_map(|s| s.jobs().iter().copied())
            .fold(Upstream::Passed, |acc, idx| {
                acc.combine(self.stage_member_state(statuses, idx))
            })
    }

    fn needs_state(&self, statuses: &[JobStatus], idx: JobIndex) -> Upstream {
        self.graph
            .dependencies_of(idx)
            .iter()
            .fold(Upstream::Passed, |acc, &dep| acc.combine(self.edge_state(statuses, dep)))
    }

    /// Everything `idx` waits on, combined.
    pub fn upstream_of(&self, statuses: &[JobStatus], idx: JobIndex) -> Upstream {
        let job = &self.pipeline.jobs()[idx];
        let stages = self.pipeline.stages();
        let prior = || self.stages_state(statuses, stages.stages_before(job.stage_idx));
        let policy_pre = || self.stages_state(statuses, stages.policy_pre());

        match &job.needs {
            Needs::Stage => prior(),
            Needs::Explicit(names) => {
                let gate = match job.kind {
                    JobKind::PolicyPre => Upstream::Passed,
                    JobKind::PolicyPost if names.is_empty() && self.config.strict_post_stage => {
                        prior()
                    }
                    JobKind::PolicyPost => policy_pre(),
                    JobKind::Build | JobKind::Bridge if self.config.dag_jobs_wait_for_policy_pre => {
                        policy_pre()
                    }
                    JobKind::Build | JobKind::Bridge => Upstream::Passed,
                };
                self.needs_state(statuses, idx).combine(gate)
            }
        }
    }

    /// Status a job becomes once it may start.
    fn ready_status(&self, idx: JobIndex) -> JobStatus {
        if self.gates.is_held(idx) {
            JobStatus::Manual
        } else {
            JobStatus::Pending
        }
    }

    /// Next status of `idx` given `statuses`, or `None` if it stays put.
    pub fn next_status(&self, statuses: &[JobStatus], idx: JobIndex) -> Option<JobStatus> {
        let job: &Job = &self.pipeline.jobs()[idx];

        match statuses[idx] {
            JobStatus::Created => {
                let upstream = self.upstream_of(statuses, idx);
                match (upstream, job.when) {
                    // Nothing is decided while any upstream job is unresolved,
                    // even next to a failure.
                    (Upstream::Incomplete | Upstream::Failing, _) => None,
                    (Upstream::Failed, When::OnSuccess | When::Manual) => Some(JobStatus::Skipped),
                    (Upstream::Passed, When::OnSuccess)
                    | (Upstream::Failed, When::OnFailure)
                    | (_, When::Always) => Some(self.ready_status(idx)),
                    (Upstream::Passed, When::Manual) => Some(JobStatus::Manual),
                    (Upstream::Passed, When::OnFailure) => Some(JobStatus::Skipped),
                }
            }
            JobStatus::Manual if job.when != When::Manual && !self.gates.is_held(idx) => {
                Some(JobStatus::Pending)
            }
            _ => None,
        }
    }

    /// One pass: every transition computed from the same snapshot.
    pub fn pass(&self, statuses: &[JobStatus], order: &[JobIndex]) -> Vec<(JobIndex, JobStatus)> {
        order
            .iter()
            .filter_map(|&idx| self.next_status(statuses, idx).map(|next| (idx, next)))
            .collect()
    }

    /// Run passes in declaration order until nothing changes.
    ///
    /// Returns the number of passes that changed something.
    pub fn run_to_fixpoint(&self, statuses: &mut [JobStatus]) -> usize {
        let order: Vec<JobIndex> = (0..statuses.len()).collect();
        self.run_to_fixpoint_in_order(statuses, &order)
    }

    /// Same as [`Propagator::run_to_fixpoint`], evaluating jobs in `order`
    /// within each pass.
    pub fn run_to_fixpoint_in_order(&self, statuses: &mut [JobStatus], order: &[JobIndex]) -> usize {
        let mut passes = 0;

        loop {
            let changes = self.pass(statuses, order);
            if changes.is_empty() {
                break;
            }

            passes += 1;
            for (idx, next) in changes {
                trace!(
                    job = %self.pipeline.jobs()[idx].name,
                    from = %statuses[idx],
                    to = %next,
                    pass = passes,
                    "transition"
                );
                statuses[idx] = next;
            }
        }

        debug!(passes, "propagation reached fixpoint");
        passes
    }
}
