//! Command-line entry point for the jobmesh engine.

mod bootstrap;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use jobmesh_core::{ArgMap, ArgValue, Context, Job, Store};
use jobmesh_jobs::job_types;
use jobmesh_worker::{
    spawn_change_watcher, start_workers_with, watch::DEFAULT_POLL_INTERVAL, CancellationToken,
};

#[derive(Parser)]
#[command(name = "jobmesh", about = "Persistent, dependency-aware job execution engine")]
struct Cli {
    /// Path to configuration file (overrides JOBMESH_CONFIG_PATH)
    #[arg(long, short = 'c', global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a pool of workers and block until they exit
    Work {
        /// Number of workers, overriding the configured count
        #[arg(long)]
        count: Option<usize>,
        /// Watch a directory and shut the workers down gracefully on the
        /// first change beneath it (development aid)
        #[arg(long)]
        watch: Option<PathBuf>,
    },
    /// Submit the demonstration pipeline and run it to completion
    Demo,
    /// Print a stored job record as JSON
    Show {
        /// Job id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config_path
        .or_else(|| std::env::var("JOBMESH_CONFIG_PATH").ok());
    let cfg = jobmesh_config::load_config(config_path.as_deref())?;
    jobmesh_config::validate_config(&cfg)?;
    bootstrap::init_tracing(&cfg.logging);

    let store = bootstrap::build_store(&cfg.store).await?;
    let ctx = jobmesh_jobs::register_all(Context::builder(store)).build();

    match cli.command {
        Command::Work { count, watch } => {
            let count = count.unwrap_or(cfg.worker.count);
            let shutdown = CancellationToken::new();

            let watch_dir = watch.or_else(|| cfg.worker.watch_dir.as_deref().map(PathBuf::from));
            if let Some(dir) = watch_dir {
                spawn_change_watcher(dir, DEFAULT_POLL_INTERVAL, shutdown.clone());
            }

            info!(count, "starting worker pool");
            start_workers_with(ctx, count, shutdown).await?;
        }
        Command::Demo => run_demo(&ctx, cfg.worker.count).await?,
        Command::Show { id } => {
            let job = Job::load_str(&ctx, &id).await?;
            println!("{}", serde_json::to_string_pretty(job.record())?);
        }
    }

    Ok(())
}

/// Build and execute the demonstration DAG.
///
/// Three audit checkpoints gate a seed job via explicit ordering edges; the
/// seed feeds an uppercase job, and both feed a combine job.
async fn run_demo(ctx: &std::sync::Arc<Context>, workers: usize) -> anyhow::Result<()> {
    info!("submitting demo pipeline");

    let mut seed = Job::new(ctx, job_types::SEED, ArgMap::new(), false).await?;

    let mut upper_args = ArgMap::new();
    upper_args.insert("text".to_owned(), (&seed).into());
    let upper = Job::new(ctx, job_types::UPPERCASE, upper_args, false).await?;

    let mut combine_args = ArgMap::new();
    combine_args.insert(
        "parts".to_owned(),
        ArgValue::Sequence(vec![(&seed).into(), (&upper).into()]),
    );
    combine_args.insert("separator".to_owned(), " | ".into());
    let mut combine = Job::new(ctx, job_types::COMBINE, combine_args, false).await?;

    for step in 0..3i64 {
        let mut checkpoint_args = ArgMap::new();
        checkpoint_args.insert("step".to_owned(), step.into());
        let mut checkpoint = Job::new(ctx, job_types::AUDIT, checkpoint_args, false).await?;
        checkpoint.then(&mut seed).await?;
        checkpoint.queue().await?;
    }

    combine.queue().await?;

    let shutdown = CancellationToken::new();
    let pool = tokio::spawn(start_workers_with(ctx.clone(), workers, shutdown.clone()));

    let record = loop {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let record = ctx
            .store()
            .find_by_id(combine.id())
            .await?
            .ok_or_else(|| anyhow::anyhow!("demo job record disappeared"))?;
        if record.completed || record.exception.is_some() {
            break record;
        }
    };

    shutdown.cancel();
    pool.await??;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
