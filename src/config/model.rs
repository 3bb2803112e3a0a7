// src/config/model.rs

use indexmap::IndexMap;
use serde::Deserialize;

use crate::types::{
    AccessLevel, DeclaredKind, DeploymentStatus, JobStatus, PolicyScope, SuffixStrategy, When,
};

/// Pipeline snapshot as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// approvals_enabled = true
///
/// [pipeline]
/// stages = ["build", "test"]
///
/// [job.regular_job]
/// stage = "build"
///
/// [job.bridge_dag_job]
/// stage = "test"
/// needs = []
/// kind = "bridge"
///
/// [[policy]]
/// source = "compliance"
/// [policy.job.policy_job]
/// stage = ".pipeline-policy-pre"
/// ```
///
/// Job tables keep their declaration order; it is the insertion order used
/// for stage bookkeeping and for the order of emitted updates.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPipelineSnapshot {
    #[serde(default)]
    pub config: EngineConfig,

    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Jobs from the project's own pipeline definition.
    #[serde(default)]
    pub job: IndexMap<String, JobConfig>,

    /// Pipeline execution policies, in injection order.
    #[serde(default)]
    pub policy: Vec<PolicyConfig>,

    /// Protected environments keyed by environment name.
    #[serde(default)]
    pub environment: IndexMap<String, EnvironmentConfig>,
}

/// A validated snapshot. Only obtainable through
/// `PipelineSnapshot::try_from(RawPipelineSnapshot)`.
#[derive(Debug, Clone)]
pub struct PipelineSnapshot {
    pub config: EngineConfig,
    pub pipeline: PipelineSection,
    pub job: IndexMap<String, JobConfig>,
    pub policy: Vec<PolicyConfig>,
    pub environment: IndexMap<String, EnvironmentConfig>,
}

impl PipelineSnapshot {
    pub(crate) fn new_unchecked(raw: RawPipelineSnapshot) -> Self {
        Self {
            config: raw.config,
            pipeline: raw.pipeline,
            job: raw.job,
            policy: raw.policy,
            environment: raw.environment,
        }
    }
}

/// `[config]` section: switches that used to be ambient feature checks.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EngineConfig {
    /// Whether protected-environment approval rules hold deployments.
    #[serde(default = "default_true")]
    pub approvals_enabled: bool,

    /// Whether `[[policy]]` jobs are injected at all.
    #[serde(default = "default_true")]
    pub policies_enabled: bool,

    /// Policy-post jobs declared with `needs = []` wait for every prior
    /// stage. When false they only wait for the policy-pre stage.
    #[serde(default = "default_true")]
    pub strict_post_stage: bool,

    /// User-stage DAG jobs also wait for the policy-pre stage.
    #[serde(default)]
    pub dag_jobs_wait_for_policy_pre: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            approvals_enabled: true,
            policies_enabled: true,
            strict_post_stage: true,
            dag_jobs_wait_for_policy_pre: false,
        }
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// User stages in execution order. Built-in and reserved stages are
    /// added around them automatically.
    #[serde(default = "default_stages")]
    pub stages: Vec<String>,
}

fn default_stages() -> Vec<String> {
    vec!["build".to_string(), "test".to_string(), "deploy".to_string()]
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            stages: default_stages(),
        }
    }
}

/// `[job.<name>]` section (also used inside a policy).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct JobConfig {
    /// Stable identifier. Assigned in declaration order when absent.
    #[serde(default)]
    pub id: Option<u64>,

    /// Stage name; `test` when absent.
    #[serde(default)]
    pub stage: Option<String>,

    /// Current status as persisted by the caller.
    #[serde(default)]
    pub status: JobStatus,

    #[serde(default)]
    pub when: When,

    /// `None` means "use the default for `when`".
    #[serde(default)]
    pub allow_failure: Option<bool>,

    /// `None`: no `needs` key (stage-sequenced job).
    /// `Some(vec![])`: DAG job that may start immediately.
    #[serde(default)]
    pub needs: Option<Vec<String>>,

    #[serde(default)]
    pub kind: DeclaredKind,

    /// Target environment; makes the job deployment-class.
    #[serde(default)]
    pub environment: Option<String>,

    /// Current deployment status, for jobs with an environment.
    #[serde(default)]
    pub deployment_status: Option<DeploymentStatus>,
}

pub const DEFAULT_STAGE: &str = "test";

impl JobConfig {
    pub fn effective_stage(&self) -> &str {
        self.stage.as_deref().unwrap_or(DEFAULT_STAGE)
    }

    /// Manual jobs are optional unless they say otherwise.
    pub fn effective_allow_failure(&self) -> bool {
        self.allow_failure.unwrap_or(self.when == When::Manual)
    }
}

/// One `[[policy]]` entry: a set of jobs injected by a pipeline execution
/// policy.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Identifier of the policy management project the policy comes from.
    pub source: String,

    #[serde(default)]
    pub scope: PolicyScope,

    #[serde(default)]
    pub suffix: SuffixStrategy,

    #[serde(default)]
    pub job: IndexMap<String, JobConfig>,
}

/// `[environment.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub approval_rule: Vec<ApprovalRuleConfig>,
}

/// `[[environment.<name>.approval_rule]]`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalRuleConfig {
    /// Kept signed so that misconfigured (non-positive) values can be
    /// reported instead of failing deserialization.
    pub required_approvals: i64,

    #[serde(default)]
    pub access_level: AccessLevel,

    /// Approvals received so far.
    #[serde(default)]
    pub approvals: u32,
}
