// src/dag/pipeline.rs

//! Pipeline assembly: turns a validated snapshot into jobs placed in a
//! [`StageIndex`], injecting policy jobs and resolving name conflicts.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::model::{JobConfig, PipelineSnapshot, PolicyConfig};
use crate::dag::approval::{Deployment, DeploymentId, ProtectedEnvironment};
use crate::dag::job::{Job, JobId, JobIndex, JobSource, Needs};
use crate::dag::stage::{StageIndex, StageKind, is_reserved_stage};
use crate::errors::{Result, StagegateError};
use crate::types::{DeploymentStatus, JobKind, JobStatus, SuffixStrategy};

/// Jobs, stages, deployments and protected environments of one pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    jobs: Vec<Job>,
    stages: StageIndex,
    by_name: HashMap<String, JobIndex>,
    deployments: Vec<Deployment>,
    environments: IndexMap<String, ProtectedEnvironment>,
}

impl Pipeline {
    /// Assemble a pipeline from a validated snapshot.
    ///
    /// Fails on project jobs in reserved or unknown stages, and on policy
    /// name conflicts under `suffix = "never"`. Needs are not resolved here;
    /// see [`crate::dag::DependencyGraph::build`].
    pub fn from_snapshot(snapshot: &PipelineSnapshot) -> Result<Self> {
        let mut builder = Builder::new(snapshot);

        for (name, cfg) in snapshot.job.iter() {
            builder.add_project_job(name, cfg)?;
        }

        if snapshot.config.policies_enabled {
            let mut per_source: HashMap<&str, usize> = HashMap::new();
            for policy in snapshot.policy.iter() {
                let slot = per_source.entry(policy.source.as_str()).or_insert(0);
                builder.add_policy(policy, *slot)?;
                *slot += 1;
            }
        } else if !snapshot.policy.is_empty() {
            warn!(
                policies = snapshot.policy.len(),
                "pipeline execution policies are disabled; ignoring policy jobs"
            );
        }

        Ok(builder.finish(snapshot))
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, idx: JobIndex) -> Option<&Job> {
        self.jobs.get(idx)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn stages(&self) -> &StageIndex {
        &self.stages
    }

    pub fn index_of(&self, name: &str) -> Option<JobIndex> {
        self.by_name.get(name).copied()
    }

    pub fn job_by_name(&self, name: &str) -> Option<&Job> {
        self.index_of(name).and_then(|i| self.jobs.get(i))
    }

    pub fn deployments(&self) -> &[Deployment] {
        &self.deployments
    }

    pub fn deployment_for(&self, job: JobIndex) -> Option<&Deployment> {
        self.deployments.iter().find(|d| d.job == job)
    }

    pub fn environment(&self, name: &str) -> Option<&ProtectedEnvironment> {
        self.environments.get(name)
    }

    pub(crate) fn environment_mut(&mut self, name: &str) -> Option<&mut ProtectedEnvironment> {
        self.environments.get_mut(name)
    }

    /// Current status of every job, indexed by [`JobIndex`].
    pub fn statuses(&self) -> Vec<JobStatus> {
        self.jobs.iter().map(|j| j.status).collect()
    }

    pub(crate) fn jobs_mut(&mut self) -> &mut [Job] {
        &mut self.jobs
    }

    pub(crate) fn deployments_mut(&mut self) -> &mut [Deployment] {
        &mut self.deployments
    }
}

struct Builder {
    jobs: Vec<Job>,
    deployment_statuses: Vec<Option<DeploymentStatus>>,
    stages: StageIndex,
    by_name: HashMap<String, JobIndex>,
    next_id: u64,
}

impl Builder {
    fn new(snapshot: &PipelineSnapshot) -> Self {
        let max_explicit = snapshot
            .job
            .values()
            .chain(snapshot.policy.iter().flat_map(|p| p.job.values()))
            .filter_map(|j| j.id)
            .max()
            .unwrap_or(0);

        Self {
            jobs: Vec::new(),
            deployment_statuses: Vec::new(),
            stages: StageIndex::new(&snapshot.pipeline.stages),
            by_name: HashMap::new(),
            next_id: max_explicit + 1,
        }
    }

    fn add_project_job(&mut self, name: &str, cfg: &JobConfig) -> Result<()> {
        let stage = cfg.effective_stage();
        if is_reserved_stage(stage) {
            return Err(StagegateError::InvalidJob {
                job: name.to_string(),
                reason: format!(
                    "chosen stage `{stage}` is reserved for pipeline execution policies"
                ),
            });
        }

        let stage_idx = self.stages.resolve(name, stage)?;
        let needs = cfg.needs.clone().map_or(Needs::Stage, Needs::Explicit);
        self.push(name.to_string(), cfg, stage_idx, cfg.kind.into(), needs, JobSource::Project);
        Ok(())
    }

    /// Inject the jobs of one policy. `slot` is the position of the policy
    /// among the policies of the same source and feeds the name suffix.
    fn add_policy(&mut self, policy: &PolicyConfig, slot: usize) -> Result<()> {
        let mut renames: HashMap<&str, String> = HashMap::new();
        let mut accepted: Vec<(&str, &JobConfig)> = Vec::new();

        for (name, cfg) in policy.job.iter() {
            let stage = cfg.effective_stage();
            if !self.stages.contains(stage) {
                warn!(
                    job = %name,
                    stage = %stage,
                    source = %policy.source,
                    "policy job uses a stage the pipeline does not declare; dropping it"
                );
                continue;
            }

            if self.by_name.contains_key(name.as_str()) {
                match policy.suffix {
                    SuffixStrategy::OnConflict => {
                        let renamed = format!("{name}:policy-{}-{slot}", policy.source);
                        debug!(job = %name, renamed = %renamed, "renaming conflicting policy job");
                        renames.insert(name.as_str(), renamed);
                    }
                    SuffixStrategy::Never => {
                        return Err(StagegateError::DuplicateJobName { name: name.clone() });
                    }
                }
            }
            accepted.push((name.as_str(), cfg));
        }

        for (name, cfg) in accepted {
            let final_name = renames
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string());

            if self.by_name.contains_key(&final_name) {
                return Err(StagegateError::DuplicateJobName { name: final_name });
            }

            let needs = match &cfg.needs {
                None => Needs::Stage,
                Some(names) => Needs::Explicit(
                    names
                        .iter()
                        .map(|n| renames.get(n.as_str()).cloned().unwrap_or_else(|| n.clone()))
                        .collect(),
                ),
            };

            let stage_idx = self.stages.resolve(&final_name, cfg.effective_stage())?;
            let kind = match self.stages.get(stage_idx).map(|s| s.kind) {
                Some(StageKind::PolicyPre) => JobKind::PolicyPre,
                Some(StageKind::PolicyPost) => JobKind::PolicyPost,
                _ => cfg.kind.into(),
            };
            let source = JobSource::Policy {
                source: policy.source.clone(),
                scope: policy.scope,
            };
            self.push(final_name, cfg, stage_idx, kind, needs, source);
        }

        Ok(())
    }

    fn push(
        &mut self,
        name: String,
        cfg: &JobConfig,
        stage_idx: usize,
        kind: JobKind,
        needs: Needs,
        source: JobSource,
    ) {
        let id = match cfg.id {
            Some(id) => JobId(id),
            None => {
                let id = JobId(self.next_id);
                self.next_id += 1;
                id
            }
        };

        let idx = self.jobs.len();
        let stage = self
            .stages
            .get(stage_idx)
            .map(|s| s.name.clone())
            .unwrap_or_default();

        self.stages.push_job(stage_idx, idx);
        self.by_name.insert(name.clone(), idx);
        self.deployment_statuses.push(cfg.deployment_status);
        self.jobs.push(Job {
            id,
            name,
            stage,
            stage_idx,
            kind,
            status: cfg.status,
            when: cfg.when,
            allow_failure: cfg.effective_allow_failure(),
            needs,
            environment: cfg.environment.clone(),
            source,
        });
    }

    fn finish(self, snapshot: &PipelineSnapshot) -> Pipeline {
        let deployments = self
            .jobs
            .iter()
            .enumerate()
            .filter_map(|(idx, job)| {
                let environment = job.environment.clone()?;
                Some(Deployment {
                    id: DeploymentId(job.id.0),
                    job: idx,
                    environment,
                    status: self.deployment_statuses[idx].unwrap_or_default(),
                })
            })
            .collect();

        let environments = snapshot
            .environment
            .iter()
            .map(|(name, cfg)| (name.clone(), ProtectedEnvironment::from_config(name, cfg)))
            .collect();

        Pipeline {
            jobs: self.jobs,
            stages: self.stages,
            by_name: self.by_name,
            deployments,
            environments,
        }
    }
}
