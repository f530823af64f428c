//! Document-store seam for the jobmesh engine.
//!
//! Every coordination primitive the engine relies on (deduplicated insert,
//! point lookup, the atomic claim, array-field edge maintenance) is
//! expressed as one operation on the [`Store`] trait. Workers and the job
//! entity never talk to each other directly; the store is the only shared
//! medium.
//!
//! Two implementations are provided:
//!
//! - [`MemoryStore`] - a single-process store used by tests and embedded
//!   deployments
//! - [`MongoStore`] - the production store backed by a MongoDB collection
//!
//! # Example
//!
//! ```rust,no_run
//! use jobmesh_store::{JobRecord, MemoryStore, Store};
//! use serde_json::Map;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let record = JobRecord::new("demo.seed", Map::new(), "digest".into());
//!     let id = store.insert(&record).await.unwrap();
//!     assert_eq!(store.find_by_id(id).await.unwrap().unwrap().id, id);
//! }
//! ```

mod error;
mod memory;
mod mongo;
mod record;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use mongo::{MongoConfig, MongoStore};
pub use record::{JobId, JobRecord};
pub use store::{EdgeField, JobField, Store};

// Re-export async_trait for downstream Store implementations
pub use async_trait::async_trait;
