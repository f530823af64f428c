//! Demonstration job handlers for the jobmesh engine.
//!
//! This crate provides small [`JobHandler`](jobmesh_core::JobHandler)
//! implementations used by the demo pipeline and by integration tests.
//!
//! # Job Types
//!
//! - `demo.seed` - produce a value out of nothing
//! - `demo.uppercase` - uppercase a text argument
//! - `demo.combine` - join a sequence of parts into one string
//! - `demo.audit` - log its arguments and return nothing; a fan-in target
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use jobmesh_core::Context;
//! use jobmesh_jobs::register_all;
//! use jobmesh_store::MemoryStore;
//!
//! let ctx = register_all(Context::builder(Arc::new(MemoryStore::new()))).build();
//! ```

mod audit;
mod combine;
mod seed;
mod uppercase;

pub use audit::AuditHandler;
pub use combine::CombineHandler;
pub use seed::SeedHandler;
pub use uppercase::UppercaseHandler;

use jobmesh_core::ContextBuilder;

/// Register all demonstration handlers on a context builder.
pub fn register_all(builder: ContextBuilder) -> ContextBuilder {
    builder
        .register(SeedHandler)
        .register(UppercaseHandler)
        .register(CombineHandler)
        .register(AuditHandler)
}

/// Job type constants for type-safe job references.
pub mod job_types {
    pub const SEED: &str = "demo.seed";
    pub const UPPERCASE: &str = "demo.uppercase";
    pub const COMBINE: &str = "demo.combine";
    pub const AUDIT: &str = "demo.audit";
}
