//! Errors surfaced by store implementations.

use thiserror::Error;

/// Errors that may occur while talking to the document store.
///
/// The engine makes no attempt at reconnection or buffering: a store error
/// propagates to the caller or worker, which is expected to fail loudly.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error("failed to encode document field: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("store backend is unavailable: {0}")]
    Unavailable(String),
}
