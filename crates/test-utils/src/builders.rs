#![allow(dead_code)]

use indexmap::IndexMap;
use stagegate::config::{
    ApprovalRuleConfig, EngineConfig, EnvironmentConfig, JobConfig, PipelineSection,
    PipelineSnapshot, PolicyConfig, RawPipelineSnapshot,
};
use stagegate::dag::PipelineProcessor;
use stagegate::types::{
    AccessLevel, DeclaredKind, DeploymentStatus, JobStatus, PolicyScope, SuffixStrategy, When,
};

/// Builder for `PipelineSnapshot` to simplify test setup.
///
/// Starts from the default engine config and the `build`/`test`/`deploy`
/// stages.
pub struct PipelineBuilder {
    raw: RawPipelineSnapshot,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawPipelineSnapshot {
                config: EngineConfig::default(),
                pipeline: PipelineSection::default(),
                job: IndexMap::new(),
                policy: Vec::new(),
                environment: IndexMap::new(),
            },
        }
    }

    pub fn with_stages(mut self, stages: &[&str]) -> Self {
        self.raw.pipeline.stages = stages.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.raw.job.insert(name.to_string(), job);
        self
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.raw.policy.push(policy);
        self
    }

    pub fn with_environment(mut self, name: &str, env: EnvironmentConfig) -> Self {
        self.raw.environment.insert(name.to_string(), env);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.raw.config = config;
        self
    }

    pub fn approvals_enabled(mut self, val: bool) -> Self {
        self.raw.config.approvals_enabled = val;
        self
    }

    pub fn policies_enabled(mut self, val: bool) -> Self {
        self.raw.config.policies_enabled = val;
        self
    }

    pub fn strict_post_stage(mut self, val: bool) -> Self {
        self.raw.config.strict_post_stage = val;
        self
    }

    pub fn dag_jobs_wait_for_policy_pre(mut self, val: bool) -> Self {
        self.raw.config.dag_jobs_wait_for_policy_pre = val;
        self
    }

    /// The unvalidated model, for tests that exercise validation itself.
    pub fn build_raw(self) -> RawPipelineSnapshot {
        self.raw
    }

    pub fn build(self) -> PipelineSnapshot {
        PipelineSnapshot::try_from(self.raw).expect("Failed to build valid snapshot from builder")
    }

    /// Validate, assemble and build the dependency graph in one go.
    pub fn processor(self) -> PipelineProcessor {
        PipelineProcessor::from_snapshot(&self.build())
            .expect("Failed to assemble pipeline from builder")
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`. Jobs start in `created` with no `needs` key.
pub struct JobBuilder {
    job: JobConfig,
}

impl JobBuilder {
    pub fn new(stage: &str) -> Self {
        Self {
            job: JobConfig {
                stage: Some(stage.to_string()),
                ..JobConfig::default()
            },
        }
    }

    /// Add one explicit need (turns the job into a DAG job).
    pub fn needs(mut self, dep: &str) -> Self {
        self.job.needs.get_or_insert_with(Vec::new).push(dep.to_string());
        self
    }

    /// `needs = []`.
    pub fn no_needs(mut self) -> Self {
        self.job.needs = Some(Vec::new());
        self
    }

    pub fn when(mut self, when: When) -> Self {
        self.job.when = when;
        self
    }

    pub fn manual(self) -> Self {
        self.when(When::Manual)
    }

    pub fn allow_failure(mut self, val: bool) -> Self {
        self.job.allow_failure = Some(val);
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        self
    }

    pub fn bridge(mut self) -> Self {
        self.job.kind = DeclaredKind::Bridge;
        self
    }

    pub fn environment(mut self, env: &str) -> Self {
        self.job.environment = Some(env.to_string());
        self
    }

    pub fn deployment_status(mut self, status: DeploymentStatus) -> Self {
        self.job.deployment_status = Some(status);
        self
    }

    pub fn id(mut self, id: u64) -> Self {
        self.job.id = Some(id);
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

/// Builder for one `[[policy]]` entry.
pub struct PolicyBuilder {
    policy: PolicyConfig,
}

impl PolicyBuilder {
    pub fn new(source: &str) -> Self {
        Self {
            policy: PolicyConfig {
                source: source.to_string(),
                scope: PolicyScope::default(),
                suffix: SuffixStrategy::default(),
                job: IndexMap::new(),
            },
        }
    }

    pub fn scope(mut self, scope: PolicyScope) -> Self {
        self.policy.scope = scope;
        self
    }

    pub fn suffix(mut self, suffix: SuffixStrategy) -> Self {
        self.policy.suffix = suffix;
        self
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.policy.job.insert(name.to_string(), job);
        self
    }

    pub fn build(self) -> PolicyConfig {
        self.policy
    }
}

/// Builder for a protected environment.
pub struct EnvironmentBuilder {
    env: EnvironmentConfig,
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self {
            env: EnvironmentConfig::default(),
        }
    }

    /// Add a rule requiring `required` approvals from `access_level`, with
    /// `approvals` already given.
    pub fn rule(mut self, required: i64, access_level: AccessLevel, approvals: u32) -> Self {
        self.env.approval_rule.push(ApprovalRuleConfig {
            required_approvals: required,
            access_level,
            approvals,
        });
        self
    }

    pub fn build(self) -> EnvironmentConfig {
        self.env
    }
}

impl Default for EnvironmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
