//! The worker: a single polling claim-and-execute loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use jobmesh_core::{Context, Error, Job, Store};

/// Backoff between probes when no claimable record exists.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// A single-threaded consumer of claimable job records.
///
/// Per iteration: check the shutdown flag, atomically claim one record,
/// execute it via [`Job::run_wrapper`]. Execution failures are recorded on
/// the record and never abort the loop; store errors do, loudly.
pub struct Worker {
    ctx: Arc<Context>,
    backoff: Duration,
    shutdown: CancellationToken,
}

impl Worker {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            backoff: DEFAULT_BACKOFF,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Attach a shutdown token; the loop exits at the next iteration
    /// boundary once it is cancelled. In-flight execution is not
    /// interrupted.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Run the claim loop until shutdown is requested or the store fails.
    pub async fn work(&self) -> Result<(), Error> {
        let mut was_idle = false;

        loop {
            if self.shutdown.is_cancelled() {
                info!("shutdown requested; worker exiting");
                return Ok(());
            }

            let Some(record) = self.ctx.store().claim_one(Utc::now()).await? else {
                // log only on the busy -> idle transition
                if !was_idle {
                    info!("no claimable jobs; sleeping");
                }
                was_idle = true;

                tokio::select! {
                    _ = tokio::time::sleep(self.backoff) => {}
                    _ = self.shutdown.cancelled() => {}
                }
                continue;
            };

            was_idle = false;
            info!(job_type = %record.job_type, id = %record.id, "claimed job");

            let mut job = Job::wrap(self.ctx.clone(), record);
            job.run_wrapper().await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jobmesh_core::{ArgMap, ArgValue, JobHandler};
    use jobmesh_store::{MemoryStore, Store};
    use serde_json::{Map, Value};

    struct Seed;

    #[async_trait]
    impl JobHandler for Seed {
        fn job_type(&self) -> &str {
            "demo.seed"
        }

        async fn run(&self, _args: Map<String, Value>) -> anyhow::Result<ArgValue> {
            Ok("seeded".into())
        }
    }

    fn test_ctx() -> (Arc<Context>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Context::builder(store.clone()).register(Seed).build(), store)
    }

    #[tokio::test]
    async fn worker_stops_on_shutdown() {
        let (ctx, _) = test_ctx();
        let token = CancellationToken::new();
        let worker = Worker::new(ctx)
            .with_backoff(Duration::from_millis(10))
            .with_shutdown(token.clone());

        let handle = tokio::spawn(async move { worker.work().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn worker_drains_queued_jobs() {
        let (ctx, store) = test_ctx();

        let mut job = Job::new(&ctx, "demo.seed", ArgMap::new(), false)
            .await
            .unwrap();
        job.queue().await.unwrap();

        let token = CancellationToken::new();
        let worker = Worker::new(ctx.clone())
            .with_backoff(Duration::from_millis(10))
            .with_shutdown(token.clone());
        let handle = tokio::spawn(async move { worker.work().await });

        // wait for completion, then stop the loop
        for _ in 0..100 {
            if store
                .find_by_id(job.id())
                .await
                .unwrap()
                .unwrap()
                .completed
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        token.cancel();
        handle.await.unwrap().unwrap();

        let stored = store.find_by_id(job.id()).await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.result, Some(serde_json::json!("seeded")));
    }
}
