// src/dag/processor.rs

use tracing::{debug, info, warn};

use crate::config::model::{EngineConfig, PipelineSnapshot};
use crate::dag::approval::{ApprovalGates, ApprovalRule};
use crate::dag::graph::DependencyGraph;
use crate::dag::job::{DispatchedJob, JobIndex};
use crate::dag::outcome::{DeploymentUpdate, ProcessOutcome, StatusUpdate, aggregate_status};
use crate::dag::pipeline::Pipeline;
use crate::dag::propagation::Propagator;
use crate::engine::JobOutcome;
use crate::errors::Result;
use crate::types::{AccessLevel, DeploymentStatus, JobStatus, PipelineStatus, When};

/// Pipeline processor: the assembled pipeline plus its dependency graph.
///
/// It is responsible for:
/// - running the propagation fixpoint after every change
/// - keeping deployments in sync with their jobs and approval gates
/// - applying runner events (started, finished, played) and approvals
/// - reporting each step as a [`ProcessOutcome`] diff
///
/// All structural errors surface in [`PipelineProcessor::from_snapshot`];
/// nothing after construction fails.
#[derive(Debug, Clone)]
pub struct PipelineProcessor {
    config: EngineConfig,
    pipeline: Pipeline,
    graph: DependencyGraph,
}

/// Job and deployment statuses captured before a step.
struct Before {
    jobs: Vec<JobStatus>,
    deployments: Vec<DeploymentStatus>,
}

impl PipelineProcessor {
    /// Assemble the pipeline, resolve needs and check for cycles.
    pub fn from_snapshot(snapshot: &PipelineSnapshot) -> Result<Self> {
        let pipeline = Pipeline::from_snapshot(snapshot)?;
        let graph = DependencyGraph::build(&pipeline)?;
        Ok(Self::new(snapshot.config, pipeline, graph))
    }

    pub fn new(config: EngineConfig, pipeline: Pipeline, graph: DependencyGraph) -> Self {
        Self {
            config,
            pipeline,
            graph,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status_of(&self, job: &str) -> Option<JobStatus> {
        self.pipeline.job_by_name(job).map(|j| j.status)
    }

    pub fn deployment_status_of(&self, job: &str) -> Option<DeploymentStatus> {
        let idx = self.pipeline.index_of(job)?;
        self.pipeline.deployment_for(idx).map(|d| d.status)
    }

    pub fn pipeline_status(&self) -> PipelineStatus {
        let gates = ApprovalGates::new(self.config.approvals_enabled, &self.pipeline);
        aggregate_status(&self.pipeline, &self.pipeline.statuses(), &gates)
    }

    /// No job is pending or running, so nothing will change until an
    /// outside action (play, approval) happens.
    pub fn is_settled(&self) -> bool {
        !self.pipeline.jobs().iter().any(|j| j.status.is_active())
    }

    /// Jobs currently pending, in dispatch form.
    pub fn pending_jobs(&self) -> Vec<DispatchedJob> {
        self.pipeline
            .jobs()
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .map(DispatchedJob::from_job)
            .collect()
    }

    /// Run propagation to a fixpoint and report what changed.
    pub fn process(&mut self) -> ProcessOutcome {
        let before = self.capture();
        let passes = self.propagate();
        self.finish_step(before, passes)
    }

    /// Force every non-terminal job to `canceled` in a single pass.
    ///
    /// No propagation runs afterwards: nothing can start once everything
    /// is terminal.
    pub fn cancel(&mut self) -> ProcessOutcome {
        let before = self.capture();

        let mut canceled = 0usize;
        for job in self.pipeline.jobs_mut().iter_mut() {
            if !job.status.is_terminal() {
                job.status = JobStatus::Canceled;
                canceled += 1;
            }
        }
        info!(canceled, "pipeline canceled");

        self.finish_step(before, 0)
    }

    /// A runner picked up a pending job.
    pub fn job_started(&mut self, job: &str) -> ProcessOutcome {
        let before = self.capture();

        match self.lookup(job) {
            Some(idx) if self.pipeline.jobs()[idx].status == JobStatus::Pending => {
                self.pipeline.jobs_mut()[idx].status = JobStatus::Running;
                debug!(job = %job, "job started");
            }
            Some(idx) => {
                warn!(
                    job = %job,
                    status = %self.pipeline.jobs()[idx].status,
                    "start reported for a job that is not pending; ignoring"
                );
            }
            None => {}
        }

        let passes = self.propagate();
        self.finish_step(before, passes)
    }

    /// A runner finished a job. Accepted from `pending` (the runner may
    /// skip the start report) or `running`.
    pub fn job_finished(&mut self, job: &str, outcome: JobOutcome) -> ProcessOutcome {
        let before = self.capture();

        match self.lookup(job) {
            Some(idx) if self.pipeline.jobs()[idx].status.is_active() => {
                let status = match outcome {
                    JobOutcome::Success => JobStatus::Success,
                    JobOutcome::Failed => JobStatus::Failed,
                };
                self.pipeline.jobs_mut()[idx].status = status;

                let record = &self.pipeline.jobs()[idx];
                if status == JobStatus::Failed {
                    warn!(
                        job = %job,
                        allow_failure = record.allow_failure,
                        downstream = self.graph.downstream_of(idx).len(),
                        "job failed"
                    );
                } else {
                    debug!(job = %job, "job succeeded");
                }
            }
            Some(idx) => {
                warn!(
                    job = %job,
                    status = %self.pipeline.jobs()[idx].status,
                    "completion reported for a job that is not active; ignoring"
                );
            }
            None => {}
        }

        let passes = self.propagate();
        self.finish_step(before, passes)
    }

    /// Play a manual job (`manual -> pending`).
    ///
    /// A job held by an unmet approval gate cannot be played; it starts on
    /// its own once approvals arrive.
    pub fn play(&mut self, job: &str) -> ProcessOutcome {
        let before = self.capture();

        if let Some(idx) = self.lookup(job) {
            let record = &self.pipeline.jobs()[idx];
            let gates = ApprovalGates::new(self.config.approvals_enabled, &self.pipeline);

            if record.status != JobStatus::Manual || record.when != When::Manual {
                warn!(
                    job = %job,
                    status = %record.status,
                    "play requested for a job that is not a manual action; ignoring"
                );
            } else if gates.is_held(idx) {
                warn!(
                    job = %job,
                    environment = record.environment.as_deref().unwrap_or_default(),
                    "job is waiting for approvals; play ignored"
                );
            } else {
                self.pipeline.jobs_mut()[idx].status = JobStatus::Pending;
                debug!(job = %job, "manual job played");
            }
        }

        let passes = self.propagate();
        self.finish_step(before, passes)
    }

    /// Record `approvals` for every rule of `environment` with
    /// `access_level`, then reprocess.
    pub fn record_approvals(
        &mut self,
        environment: &str,
        access_level: AccessLevel,
        approvals: u32,
    ) -> ProcessOutcome {
        let before = self.capture();

        match self.pipeline.environment_mut(environment) {
            Some(env) => {
                if env.record_approvals(access_level, approvals) {
                    let missing: u32 = env.rules.iter().map(ApprovalRule::missing_approvals).sum();
                    info!(
                        environment = %environment,
                        access_level = %access_level,
                        approvals,
                        missing,
                        "approvals recorded"
                    );
                } else {
                    debug!(environment = %environment, "approval counts unchanged");
                }
            }
            None => {
                warn!(environment = %environment, "approvals for unknown environment; ignoring");
            }
        }

        let passes = self.propagate();
        self.finish_step(before, passes)
    }

    fn lookup(&self, job: &str) -> Option<JobIndex> {
        let idx = self.pipeline.index_of(job);
        if idx.is_none() {
            warn!(job = %job, "event for unknown job; ignoring");
        }
        idx
    }

    fn capture(&self) -> Before {
        Before {
            jobs: self.pipeline.statuses(),
            deployments: self.pipeline.deployments().iter().map(|d| d.status).collect(),
        }
    }

    fn propagate(&mut self) -> usize {
        let mut statuses = self.pipeline.statuses();
        let passes = {
            let propagator = Propagator::new(&self.config, &self.pipeline, &self.graph);
            propagator.run_to_fixpoint(&mut statuses)
        };

        for (job, status) in self.pipeline.jobs_mut().iter_mut().zip(statuses) {
            job.status = status;
        }
        passes
    }

    /// Bring deployments in line with their jobs and diff everything
    /// against `before`.
    fn finish_step(&mut self, before: Before, passes: usize) -> ProcessOutcome {
        let statuses = self.pipeline.statuses();

        let deployment_statuses: Vec<DeploymentStatus> = {
            let gates = ApprovalGates::new(self.config.approvals_enabled, &self.pipeline);
            self.pipeline
                .deployments()
                .iter()
                .map(|d| gates.deployment_status(d.job, statuses[d.job]))
                .collect()
        };
        for (deployment, status) in self
            .pipeline
            .deployments_mut()
            .iter_mut()
            .zip(deployment_statuses)
        {
            deployment.status = status;
        }

        let jobs = self.pipeline.jobs();
        let mut changed: Vec<JobIndex> = (0..jobs.len())
            .filter(|&idx| before.jobs[idx] != statuses[idx])
            .collect();
        changed.sort_by_key(|&idx| (jobs[idx].stage_idx, idx));

        let status_updates = changed
            .into_iter()
            .map(|idx| StatusUpdate {
                job_id: jobs[idx].id,
                name: jobs[idx].name.clone(),
                from: before.jobs[idx],
                to: statuses[idx],
            })
            .collect::<Vec<_>>();

        let deployment_updates = self
            .pipeline
            .deployments()
            .iter()
            .zip(before.deployments.iter())
            .filter(|(d, prev)| d.status != **prev)
            .map(|(d, prev)| DeploymentUpdate {
                deployment_id: d.id,
                environment: d.environment.clone(),
                from: *prev,
                to: d.status,
            })
            .collect::<Vec<_>>();

        let gates = ApprovalGates::new(self.config.approvals_enabled, &self.pipeline);
        let pipeline_status = aggregate_status(&self.pipeline, &statuses, &gates);

        if !status_updates.is_empty() || !deployment_updates.is_empty() {
            info!(
                jobs = status_updates.len(),
                deployments = deployment_updates.len(),
                pipeline = %pipeline_status,
                "pipeline processed"
            );
        }

        ProcessOutcome {
            status_updates,
            deployment_updates,
            pipeline_status,
            passes,
        }
    }
}
