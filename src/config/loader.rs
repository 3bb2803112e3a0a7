// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{PipelineSnapshot, RawPipelineSnapshot};
use crate::errors::Result;

/// Snapshot file read when `--pipeline` is not given.
pub const DEFAULT_SNAPSHOT_PATH: &str = "Pipeline.toml";

/// Load a snapshot file and return the raw, unvalidated model.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineSnapshot> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Deserialize a snapshot from TOML text.
pub fn parse_str(contents: &str) -> Result<RawPipelineSnapshot> {
    let raw: RawPipelineSnapshot = toml::from_str(contents)?;
    Ok(raw)
}

/// Load a snapshot file and run configuration-time validation
/// (approval rules, stage declarations, ids).
///
/// Graph checks happen later, when the snapshot is assembled into a
/// [`crate::dag::Pipeline`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineSnapshot> {
    let raw = load_from_path(&path)?;
    PipelineSnapshot::try_from(raw)
}
