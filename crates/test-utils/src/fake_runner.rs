use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use stagegate::dag::DispatchedJob;
use stagegate::engine::{JobOutcome, PipelineEvent};
use stagegate::errors::Result;
use stagegate::exec::RunnerBackend;
use tokio::sync::mpsc;

/// A fake runner that:
/// - records which jobs were dispatched, in order
/// - immediately reports `JobStarted` and `JobFinished` for each of them,
///   failing the jobs listed in `failing`.
pub struct FakeRunner {
    runtime_tx: mpsc::Sender<PipelineEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeRunner {
    pub fn new(runtime_tx: mpsc::Sender<PipelineEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, job: &str) -> Self {
        self.failing.insert(job.to_string());
        self
    }
}

impl RunnerBackend for FakeRunner {
    fn dispatch_jobs(
        &mut self,
        jobs: Vec<DispatchedJob>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for job in jobs {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(job.name.clone());
                }

                let outcome = if failing.contains(&job.name) {
                    JobOutcome::Failed
                } else {
                    JobOutcome::Success
                };

                tx.send(PipelineEvent::JobStarted {
                    job: job.name.clone(),
                })
                .await
                .map_err(anyhow::Error::from)?;
                tx.send(PipelineEvent::JobFinished {
                    job: job.name.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
