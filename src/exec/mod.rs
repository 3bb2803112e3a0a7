// src/exec/mod.rs

//! Job execution layer.
//!
//! - [`backend`] provides the `RunnerBackend` trait the runtime talks to.
//! - [`simulated`] is the runner used by `stagegate --simulate`.

pub mod backend;
pub mod simulated;

pub use backend::RunnerBackend;
pub use simulated::SimulatedRunner;
