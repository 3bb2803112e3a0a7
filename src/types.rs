// src/types.rs

//! Small enums shared by the snapshot model, the engine and the CLI.

use std::fmt;

use serde::Deserialize;

/// Status of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Created,
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
    Manual,
    Canceled,
}

impl JobStatus {
    /// `success`, `failed`, `skipped` and `canceled` never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::Skipped | JobStatus::Canceled
        )
    }

    /// Pending or running: the job is with a runner (or about to be).
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
            JobStatus::Manual => "manual",
            JobStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `when` keyword of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum When {
    #[default]
    OnSuccess,
    OnFailure,
    Always,
    Manual,
}

/// What kind of processable a job is.
///
/// `PolicyPre` / `PolicyPost` are assigned during assembly to policy jobs
/// placed in the reserved stages; they are never declared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Build,
    Bridge,
    PolicyPre,
    PolicyPost,
}

/// Declared kind in the snapshot (`kind = "bridge"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredKind {
    #[default]
    Build,
    Bridge,
}

impl From<DeclaredKind> for JobKind {
    fn from(kind: DeclaredKind) -> Self {
        match kind {
            DeclaredKind::Build => JobKind::Build,
            DeclaredKind::Bridge => JobKind::Bridge,
        }
    }
}

/// Status of the deployment linked to a deployment-class job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    #[default]
    Created,
    Blocked,
    Running,
    Success,
    Failed,
    Canceled,
    Skipped,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeploymentStatus::Created => "created",
            DeploymentStatus::Blocked => "blocked",
            DeploymentStatus::Running => "running",
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failed => "failed",
            DeploymentStatus::Canceled => "canceled",
            DeploymentStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Aggregate status of a whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Created,
    Running,
    /// Nothing is active, but something waits on a manual action or an
    /// approval.
    Blocked,
    Success,
    Failed,
    Canceled,
    Skipped,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Created => "created",
            PipelineStatus::Running => "running",
            PipelineStatus::Blocked => "blocked",
            PipelineStatus::Success => "success",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Canceled => "canceled",
            PipelineStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// How a policy resolves job names that clash with already-present jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuffixStrategy {
    /// Rename the policy job to `<name>:policy-<source>-<index>`.
    #[default]
    OnConflict,
    /// Reject the pipeline.
    Never,
}

/// Where a policy was configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyScope {
    #[default]
    Project,
    Namespace,
}

/// Role required to approve a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Developer,
    #[default]
    Maintainer,
    Admin,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessLevel::Developer => "developer",
            AccessLevel::Maintainer => "maintainer",
            AccessLevel::Admin => "admin",
        };
        f.write_str(s)
    }
}
