// src/config/mod.rs

//! Pipeline snapshot input.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a snapshot from disk or a string.
//! - `validate.rs`: configuration-time checks (approval rules, stages, ids).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_SNAPSHOT_PATH, load_and_validate, load_from_path, parse_str};
pub use model::{
    ApprovalRuleConfig, EngineConfig, EnvironmentConfig, JobConfig, PipelineSection,
    PipelineSnapshot, PolicyConfig, RawPipelineSnapshot,
};
pub use validate::validate_snapshot;
