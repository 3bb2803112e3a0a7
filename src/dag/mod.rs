// src/dag/mod.rs

//! Pipeline model and status processing.
//!
//! - [`stage`] orders built-in, reserved and user stages.
//! - [`job`] is the job node model.
//! - [`pipeline`] assembles a snapshot into jobs, injecting policy jobs.
//! - [`graph`] resolves `needs` into edges and rejects cycles.
//! - [`approval`] overlays protected-environment approval gates.
//! - [`propagation`] is the fixpoint status engine.
//! - [`processor`] applies events and reports [`outcome`] diffs.

pub mod approval;
pub mod graph;
pub mod job;
pub mod outcome;
pub mod pipeline;
pub mod processor;
pub mod propagation;
pub mod stage;

pub use approval::{ApprovalGates, ApprovalRule, Deployment, DeploymentId, ProtectedEnvironment};
pub use graph::DependencyGraph;
pub use job::{DispatchedJob, Job, JobId, JobIndex, JobSource, Needs};
pub use outcome::{DeploymentUpdate, ProcessOutcome, StatusUpdate, aggregate_status};
pub use pipeline::Pipeline;
pub use processor::PipelineProcessor;
pub use propagation::{Propagator, Upstream};
pub use stage::{Stage, StageIndex, StageKind};
