// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{PipelineSnapshot, RawPipelineSnapshot};
use crate::dag::stage::{POLICY_POST_STAGE, POLICY_PRE_STAGE, is_builtin_stage};
use crate::errors::{Result, StagegateError};

impl TryFrom<RawPipelineSnapshot> for PipelineSnapshot {
    type Error = crate::errors::StagegateError;

    fn try_from(raw: RawPipelineSnapshot) -> std::result::Result<Self, Self::Error> {
        validate_snapshot(&raw)?;
        Ok(PipelineSnapshot::new_unchecked(raw))
    }
}

/// Run every configuration-time check on a raw snapshot.
///
/// Graph-level problems (unknown stages, missing needs, cycles) are left to
/// pipeline assembly, which can attribute them to the final job names.
pub fn validate_snapshot(raw: &RawPipelineSnapshot) -> Result<()> {
    ensure_has_jobs(raw)?;
    validate_stages(raw)?;
    validate_job_ids(raw)?;
    validate_policies(raw)?;
    validate_approval_rules(raw)?;
    Ok(())
}

fn ensure_has_jobs(raw: &RawPipelineSnapshot) -> Result<()> {
    let policy_jobs = raw.policy.iter().map(|p| p.job.len()).sum::<usize>();
    if raw.job.is_empty() && policy_jobs == 0 {
        return Err(StagegateError::ConfigError(
            "snapshot must contain at least one [job.<name>] or policy job".to_string(),
        ));
    }
    Ok(())
}

fn validate_stages(raw: &RawPipelineSnapshot) -> Result<()> {
    let mut seen = HashSet::new();
    for stage in raw.pipeline.stages.iter() {
        if stage.trim().is_empty() {
            return Err(StagegateError::ConfigError(
                "[pipeline].stages must not contain empty names".to_string(),
            ));
        }
        if stage == POLICY_PRE_STAGE || stage == POLICY_POST_STAGE {
            return Err(StagegateError::ConfigError(format!(
                "stage `{stage}` is reserved for pipeline execution policies"
            )));
        }
        if is_builtin_stage(stage) {
            return Err(StagegateError::ConfigError(format!(
                "stage `{stage}` is built in and must not be declared in [pipeline].stages"
            )));
        }
        if !seen.insert(stage.as_str()) {
            return Err(StagegateError::ConfigError(format!(
                "stage `{stage}` is declared more than once"
            )));
        }
    }
    Ok(())
}

fn validate_job_ids(raw: &RawPipelineSnapshot) -> Result<()> {
    let mut seen = HashSet::new();
    let explicit = raw
        .job
        .iter()
        .chain(raw.policy.iter().flat_map(|p| p.job.iter()))
        .filter_map(|(name, job)| job.id.map(|id| (name, id)));

    for (name, id) in explicit {
        if !seen.insert(id) {
            return Err(StagegateError::ConfigError(format!(
                "job '{name}' reuses id {id}"
            )));
        }
    }
    Ok(())
}

fn validate_policies(raw: &RawPipelineSnapshot) -> Result<()> {
    for policy in raw.policy.iter() {
        if policy.source.trim().is_empty() {
            return Err(StagegateError::ConfigError(
                "[[policy]] entries must name their source".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_approval_rules(raw: &RawPipelineSnapshot) -> Result<()> {
    for (name, env) in raw.environment.iter() {
        for rule in env.approval_rule.iter() {
            if rule.required_approvals <= 0 {
                return Err(StagegateError::InvalidApprovalRule {
                    environment: name.clone(),
                    required: rule.required_approvals,
                });
            }
        }
    }
    Ok(())
}
