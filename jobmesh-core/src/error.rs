//! Engine errors.

use jobmesh_store::{JobId, StoreError};
use thiserror::Error;

/// Errors surfaced by the job entity and the reference codec.
///
/// Execution failures inside a handler's `run` are NOT represented here:
/// they are caught at the `run_wrapper` boundary, recorded on the job
/// record, and never re-raised to the worker loop.
#[derive(Debug, Error)]
pub enum Error {
    /// Load of a record that does not exist.
    #[error("job {0} not found")]
    NotFound(JobId),

    /// A value that is not a recognized id form.
    #[error("invalid job id '{0}'")]
    InvalidId(String),

    /// Argument-bag accessor miss.
    #[error("'{job_type}' job has no attribute '{attribute}'")]
    MissingAttribute { job_type: String, attribute: String },

    /// The stored type name has no registered handler.
    #[error("no handler registered for job type '{0}'")]
    UnknownType(String),

    /// A handler that does not override `run` was executed.
    #[error("job type '{0}' does not implement run")]
    Unimplemented(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode value: {0}")]
    Serialize(#[from] serde_json::Error),
}
