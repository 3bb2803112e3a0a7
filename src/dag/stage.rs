// src/dag/stage.rs

//! Stage ordering.
//!
//! The index always contains, in this order:
//! `.pipeline-policy-pre`, `.pre`, the user stages, `.post`,
//! `.pipeline-policy-post`. Stages without jobs stay in the index; callers
//! that need "the previous stage" skip empty ones.

use std::collections::HashMap;

use crate::dag::job::JobIndex;
use crate::errors::{Result, StagegateError};

pub const POLICY_PRE_STAGE: &str = ".pipeline-policy-pre";
pub const PRE_STAGE: &str = ".pre";
pub const POST_STAGE: &str = ".post";
pub const POLICY_POST_STAGE: &str = ".pipeline-policy-post";

/// `.pre` / `.post`: always present, may be used by any job.
pub fn is_builtin_stage(name: &str) -> bool {
    name == PRE_STAGE || name == POST_STAGE
}

/// Stages only pipeline execution policies may place jobs in.
pub fn is_reserved_stage(name: &str) -> bool {
    name == POLICY_PRE_STAGE || name == POLICY_POST_STAGE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    PolicyPre,
    Pre,
    User,
    Post,
    PolicyPost,
}

#[derive(Debug, Clone)]
pub struct Stage {
    pub index: usize,
    pub name: String,
    pub kind: StageKind,
    jobs: Vec<JobIndex>,
}

impl Stage {
    fn new(index: usize, name: &str, kind: StageKind) -> Self {
        Self {
            index,
            name: name.to_string(),
            kind,
            jobs: Vec::new(),
        }
    }

    /// Jobs in this stage, in insertion order.
    pub fn jobs(&self) -> &[JobIndex] {
        &self.jobs
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Total order over the stages of one pipeline.
#[derive(Debug, Clone)]
pub struct StageIndex {
    stages: Vec<Stage>,
    by_name: HashMap<String, usize>,
}

impl StageIndex {
    /// Build the index around the user-declared stages.
    pub fn new(user_stages: &[String]) -> Self {
        let mut names: Vec<(&str, StageKind)> = Vec::with_capacity(user_stages.len() + 4);
        names.push((POLICY_PRE_STAGE, StageKind::PolicyPre));
        names.push((PRE_STAGE, StageKind::Pre));
        names.extend(user_stages.iter().map(|s| (s.as_str(), StageKind::User)));
        names.push((POST_STAGE, StageKind::Post));
        names.push((POLICY_POST_STAGE, StageKind::PolicyPost));

        let stages: Vec<Stage> = names
            .into_iter()
            .enumerate()
            .map(|(index, (name, kind))| Stage::new(index, name, kind))
            .collect();

        let by_name = stages
            .iter()
            .map(|s| (s.name.clone(), s.index))
            .collect();

        Self { stages, by_name }
    }

    /// All stages sorted by index.
    pub fn order(&self) -> &[Stage] {
        &self.stages
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Resolve the stage of `job`, failing with [`StagegateError::UnknownStage`].
    pub fn resolve(&self, job: &str, stage: &str) -> Result<usize> {
        self.index_of(stage)
            .ok_or_else(|| StagegateError::UnknownStage {
                job: job.to_string(),
                stage: stage.to_string(),
            })
    }

    pub(crate) fn push_job(&mut self, stage: usize, job: JobIndex) {
        if let Some(s) = self.stages.get_mut(stage) {
            s.jobs.push(job);
        }
    }

    pub fn get(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    /// Jobs of the named stage in insertion order; empty for unknown names.
    pub fn jobs_in(&self, stage: &str) -> &[JobIndex] {
        self.index_of(stage)
            .and_then(|i| self.stages.get(i))
            .map(|s| s.jobs())
            .unwrap_or(&[])
    }

    /// Every stage ordered strictly before `index`.
    pub fn stages_before(&self, index: usize) -> &[Stage] {
        &self.stages[..index.min(self.stages.len())]
    }

    /// Closest stage before `index` that has at least one job.
    pub fn previous_non_empty(&self, index: usize) -> Option<&Stage> {
        self.stages_before(index).iter().rev().find(|s| !s.is_empty())
    }

    /// The reserved pre stage as a one-element slice, for composite checks.
    pub fn policy_pre(&self) -> &[Stage] {
        &self.stages[..1]
    }
}
