//! Job entity, reference codec and dependency graph for the jobmesh engine.
//!
//! Callers describe units of work whose arguments may reference other jobs;
//! construction persists the record, deduplicates identical submissions by
//! content digest, and wires dependency edges in both directions. Workers
//! later reload records through the handler registry and execute them via
//! [`Job::run_wrapper`].
//!
//! # Architecture
//!
//! - [`Job`] - the in-process handle over a persistent job record
//! - [`JobHandler`] - trait supplying the behavior for one job type
//! - [`Context`] - store handle, handler registry and reference decoders,
//!   built once at startup and passed by `Arc` (no ambient global)
//! - [`codec`] - the recursive compress/expand machinery for job references
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use jobmesh_core::{ArgMap, ArgValue, Context, Job, JobHandler};
//! use jobmesh_store::MemoryStore;
//! use serde_json::{Map, Value};
//!
//! struct Seed;
//!
//! #[jobmesh_core::async_trait]
//! impl JobHandler for Seed {
//!     fn job_type(&self) -> &str {
//!         "demo.seed"
//!     }
//!
//!     async fn run(&self, _args: Map<String, Value>) -> anyhow::Result<ArgValue> {
//!         Ok("seeded".into())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = Context::builder(Arc::new(MemoryStore::new()))
//!         .register(Seed)
//!         .build();
//!
//!     let mut job = Job::new(&ctx, "demo.seed", ArgMap::new(), false).await?;
//!     job.queue().await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
mod context;
mod error;
mod handler;
mod hash;
mod job;

pub use codec::{ArgMap, ArgValue, RefDecoder, Reference, Referenceable};
pub use context::{Context, ContextBuilder};
pub use error::Error;
pub use handler::JobHandler;
pub use job::{extract_dependencies, CallOutcome, Job};

// Re-export the store seam and async_trait for handler implementations
pub use async_trait::async_trait;
pub use jobmesh_store::{JobId, JobRecord, Store};
