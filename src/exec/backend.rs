// src/exec/backend.rs

//! Pluggable runner backend abstraction.
//!
//! The runtime hands newly pending jobs to a `RunnerBackend`. The backend
//! reports progress by sending `JobStarted` / `JobFinished` events back to
//! the runtime channel. The CLI uses [`crate::exec::SimulatedRunner`];
//! tests provide their own backends.

use std::future::Future;
use std::pin::Pin;

use crate::dag::DispatchedJob;
use crate::errors::Result;

pub trait RunnerBackend: Send {
    /// Hand the given jobs to the runner. Must not wait for the jobs to
    /// finish: completion is reported through runtime events.
    fn dispatch_jobs(
        &mut self,
        jobs: Vec<DispatchedJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
