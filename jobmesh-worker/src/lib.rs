//! Worker claim loop and worker pool for the jobmesh engine.
//!
//! Each [`Worker`] is an independent consumer: it knows nothing about its
//! peers and coordinates with them only through the store's atomic claim.
//! The pool spawns a fixed number of workers with a staggered start and
//! waits for all of them.
//!
//! The [`watch`] module provides an optional development aid: a polling
//! filesystem watcher that requests graceful worker shutdown on the first
//! change beneath a directory.

mod pool;
pub mod watch;
mod worker;

pub use pool::{start_workers, start_workers_with, SPAWN_STAGGER};
pub use watch::spawn_change_watcher;
pub use worker::{Worker, DEFAULT_BACKOFF};

// Re-export the shutdown token type wired through the pool and watcher
pub use tokio_util::sync::CancellationToken;
