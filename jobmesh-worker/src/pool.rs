//! The worker pool: N independent workers, staggered start, wait for all.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use jobmesh_core::{Context, Error};

use crate::worker::Worker;

/// Delay between worker spawns, avoiding a startup thundering herd
/// against the store.
pub const SPAWN_STAGGER: Duration = Duration::from_millis(250);

/// Spawn `count` workers and wait for all of them to exit.
///
/// Workers share nothing but the context handle; all coordination flows
/// through the store. Without an external shutdown signal the pool runs
/// until a worker fails on a store error.
pub async fn start_workers(ctx: Arc<Context>, count: usize) -> Result<(), Error> {
    start_workers_with(ctx, count, CancellationToken::new()).await
}

/// [`start_workers`] with a caller-supplied shutdown token; cancelling it
/// stops every worker at its next iteration boundary.
pub async fn start_workers_with(
    ctx: Arc<Context>,
    count: usize,
    shutdown: CancellationToken,
) -> Result<(), Error> {
    let mut workers = JoinSet::new();

    for index in 0..count {
        let worker = Worker::new(ctx.clone()).with_shutdown(shutdown.clone());
        workers.spawn(async move {
            info!(index, "worker started");
            worker.work().await
        });
        tokio::time::sleep(SPAWN_STAGGER).await;
    }

    let mut first_error = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(error = %err, "worker failed");
                first_error.get_or_insert(err);
            }
            Err(join_err) => error!(error = %join_err, "worker task aborted"),
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jobmesh_core::{ArgMap, ArgValue, Job, JobHandler};
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

    struct Upper;

    #[async_trait]
    impl JobHandler for Upper {
        fn job_type(&self) -> &str {
            "demo.upper"
        }

        async fn run(&self, args: Map<String, Value>) -> anyhow::Result<ArgValue> {
            let text = args
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow::anyhow!("missing text argument"))?;
            Ok(text.to_uppercase().into())
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pool_executes_a_dag_across_racing_workers() {
        let store = Arc::new(MemoryStore::new());
        let ctx = Context::builder(store.clone())
            .register(Seed)
            .register(Upper)
            .build();

        let a = Job::new(&ctx, "demo.seed", ArgMap::new(), false)
            .await
            .unwrap();
        let mut args = ArgMap::new();
        args.insert("text".to_owned(), (&a).into());
        let mut b = Job::new(&ctx, "demo.upper", args, false).await.unwrap();
        b.queue().await.unwrap();

        let shutdown = CancellationToken::new();
        let pool = tokio::spawn(start_workers_with(ctx.clone(), 3, shutdown.clone()));

        let mut done = false;
        for _ in 0..300 {
            if store
                .find_by_id(b.id())
                .await
                .unwrap()
                .unwrap()
                .completed
            {
                done = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        shutdown.cancel();
        pool.await.unwrap().unwrap();

        assert!(done, "dependent job never completed");
        let stored_b = store.find_by_id(b.id()).await.unwrap().unwrap();
        assert_eq!(stored_b.result, Some(serde_json::json!("SEEDED")));
        // each record was executed exactly once: both claims are held
        let stored_a = store.find_by_id(a.id()).await.unwrap().unwrap();
        assert!(stored_a.completed);
        assert!(stored_a.claimed.is_some());
        assert!(stored_b.claimed.is_some());
    }
}
