// src/exec/simulated.rs

//! Runner that pretends to execute jobs.
//!
//! Every dispatched job is reported as started, then, after a fixed delay,
//! as finished. Jobs named in `failing` finish as failed; everything else
//! succeeds.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::DispatchedJob;
use crate::engine::{JobOutcome, PipelineEvent};
use crate::errors::{Error, Result};
use crate::exec::backend::RunnerBackend;

pub struct SimulatedRunner {
    tx: mpsc::Sender<DispatchedJob>,
}

impl SimulatedRunner {
    /// Spawn the background runner loop, wired to the runtime event sender.
    pub fn new(
        runtime_tx: mpsc::Sender<PipelineEvent>,
        failing: HashSet<String>,
        delay: Duration,
    ) -> Self {
        let tx = spawn_simulated_runner(runtime_tx, Arc::new(failing), delay);
        Self { tx }
    }
}

impl RunnerBackend for SimulatedRunner {
    fn dispatch_jobs(
        &mut self,
        jobs: Vec<DispatchedJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            for job in jobs {
                tx.send(job).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}

fn spawn_simulated_runner(
    runtime_tx: mpsc::Sender<PipelineEvent>,
    failing: Arc<HashSet<String>>,
    delay: Duration,
) -> mpsc::Sender<DispatchedJob> {
    let (tx, mut rx) = mpsc::channel::<DispatchedJob>(32);

    tokio::spawn(async move {
        info!("simulated runner started");

        while let Some(job) = rx.recv().await {
            let runtime_tx = runtime_tx.clone();
            let outcome = if failing.contains(&job.name) {
                JobOutcome::Failed
            } else {
                JobOutcome::Success
            };

            tokio::spawn(async move {
                run_job(job, outcome, delay, runtime_tx).await;
            });
        }

        info!("simulated runner finished (channel closed)");
    });

    tx
}

async fn run_job(
    job: DispatchedJob,
    outcome: JobOutcome,
    delay: Duration,
    runtime_tx: mpsc::Sender<PipelineEvent>,
) {
    debug!(job = %job.name, id = %job.id, kind = ?job.kind, "simulating job");

    let started = PipelineEvent::JobStarted {
        job: job.name.clone(),
    };
    if runtime_tx.send(started).await.is_err() {
        warn!(job = %job.name, "runtime gone before job start was reported");
        return;
    }

    tokio::time::sleep(delay).await;

    let finished = PipelineEvent::JobFinished {
        job: job.name.clone(),
        outcome,
    };
    if runtime_tx.send(finished).await.is_err() {
        warn!(job = %job.name, "runtime gone before job completion was reported");
    }
}
