// src/dag/approval.rs

//! Approval gate overlay.
//!
//! A deployment-class job whose environment carries approval rules is
//! "held" until every rule has collected its required approvals. A held job
//! never counts as passed for its dependents and its deployment reports
//! `blocked`. The overlay only reads counts; approvals themselves are
//! recorded by the caller.

use std::fmt;

use crate::config::model::EnvironmentConfig;
use crate::dag::job::JobIndex;
use crate::dag::pipeline::Pipeline;
use crate::types::{AccessLevel, DeploymentStatus, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRule {
    pub required_approvals: u32,
    pub access_level: AccessLevel,
    pub approvals: u32,
}

impl ApprovalRule {
    pub fn is_satisfied(&self) -> bool {
        self.approvals >= self.required_approvals
    }

    pub fn missing_approvals(&self) -> u32 {
        self.required_approvals.saturating_sub(self.approvals)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedEnvironment {
    pub name: String,
    pub rules: Vec<ApprovalRule>,
}

impl ProtectedEnvironment {
    /// Build from a validated snapshot entry. Rule validation already
    /// rejected non-positive requirements.
    pub fn from_config(name: &str, cfg: &EnvironmentConfig) -> Self {
        let rules = cfg
            .approval_rule
            .iter()
            .map(|r| ApprovalRule {
                required_approvals: u32::try_from(r.required_approvals).unwrap_or(u32::MAX),
                access_level: r.access_level,
                approvals: r.approvals,
            })
            .collect();

        Self {
            name: name.to_string(),
            rules,
        }
    }

    /// An environment without rules is protected but never held.
    pub fn is_satisfied(&self) -> bool {
        self.rules.iter().all(ApprovalRule::is_satisfied)
    }

    /// Set the approval count of every rule for `access_level`.
    ///
    /// Returns `true` if any rule changed.
    pub fn record_approvals(&mut self, access_level: AccessLevel, approvals: u32) -> bool {
        let mut changed = false;
        for rule in self.rules.iter_mut().filter(|r| r.access_level == access_level) {
            if rule.approvals != approvals {
                rule.approvals = approvals;
                changed = true;
            }
        }
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeploymentId(pub u64);

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deployment #{}", self.0)
    }
}

/// Deployment created by a deployment-class job (1:1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub id: DeploymentId,
    pub job: JobIndex,
    pub environment: String,
    pub status: DeploymentStatus,
}

/// Read-only view used by the propagation engine.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalGates<'a> {
    enabled: bool,
    pipeline: &'a Pipeline,
}

impl<'a> ApprovalGates<'a> {
    pub fn new(enabled: bool, pipeline: &'a Pipeline) -> Self {
        Self { enabled, pipeline }
    }

    /// Whether the job at `idx` waits for approvals.
    pub fn is_held(&self, idx: JobIndex) -> bool {
        if !self.enabled {
            return false;
        }

        self.pipeline
            .jobs()
            .get(idx)
            .and_then(|job| job.environment.as_deref())
            .and_then(|env| self.pipeline.environment(env))
            .is_some_and(|env| !env.is_satisfied())
    }

    /// Deployment status implied by the job status and the gate.
    pub fn deployment_status(&self, idx: JobIndex, status: JobStatus) -> DeploymentStatus {
        match status {
            JobStatus::Failed => DeploymentStatus::Failed,
            JobStatus::Canceled => DeploymentStatus::Canceled,
            JobStatus::Skipped => DeploymentStatus::Skipped,
            _ if self.is_held(idx) => DeploymentStatus::Blocked,
            JobStatus::Created | JobStatus::Pending | JobStatus::Manual => {
                DeploymentStatus::Created
            }
            JobStatus::Running => DeploymentStatus::Running,
            JobStatus::Success => DeploymentStatus::Success,
        }
    }
}
