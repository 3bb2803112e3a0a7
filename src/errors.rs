// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Every structural problem with a pipeline (unknown stage, missing need,
//! cycle, reserved stage, duplicate name) is reported once, while the
//! pipeline is being assembled. Nothing in the propagation engine returns
//! an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagegateError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("job '{job}' references unknown stage '{stage}'")]
    UnknownStage { job: String, stage: String },

    #[error("job '{job}' needs '{need}', which is not defined in the pipeline")]
    MissingNeed { job: String, need: String },

    #[error("cyclic dependency detected in the needs graph involving job '{job}'")]
    CyclicDependency { job: String },

    #[error("invalid job '{job}': {reason}")]
    InvalidJob { job: String, reason: String },

    #[error(
        "environment '{environment}' has an approval rule requiring {required} approvals (must be >= 1)"
    )]
    InvalidApprovalRule { environment: String, required: i64 },

    #[error("pipeline execution policy error: job names must be unique ({name})")]
    DuplicateJobName { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StagegateError {
    /// Name of the job, stage or environment the error is attributed to, if
    /// any. Callers use it to point the user at the offending definition.
    pub fn subject(&self) -> Option<&str> {
        match self {
            StagegateError::UnknownStage { job, .. }
            | StagegateError::MissingNeed { job, .. }
            | StagegateError::CyclicDependency { job }
            | StagegateError::InvalidJob { job, .. } => Some(job),
            StagegateError::InvalidApprovalRule { environment, .. } => Some(environment),
            StagegateError::DuplicateJobName { name } => Some(name),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StagegateError>;
