//! The store trait: the engine's only coordination medium.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::StoreError;
use crate::record::{JobId, JobRecord};

/// The two array fields that carry dependency edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeField {
    /// Outstanding dependency ids on the dependent side of an edge.
    TriggerIds,
    /// Dependent ids to notify on completion.
    Then,
}

impl EdgeField {
    /// Field name on the wire.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TriggerIds => "trigger_ids",
            Self::Then => "then",
        }
    }
}

/// A single-field write-through.
///
/// There is deliberately no `Claimed` variant: the claim transition happens
/// only inside [`Store::claim_one`], which is what keeps it atomic.
#[derive(Debug, Clone)]
pub enum JobField {
    Ready(bool),
    Completed(bool),
    Result(Value),
    Exception(String),
}

impl JobField {
    /// Field name on the wire.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ready(_) => "ready",
            Self::Completed(_) => "completed",
            Self::Result(_) => "result",
            Self::Exception(_) => "exception",
        }
    }
}

/// A document store supporting the engine's coordination primitives.
///
/// Implementations must make [`claim_one`](Store::claim_one) linearizable
/// per record: of any number of concurrent callers, exactly one observes a
/// given claimable record.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a new record. The record's id is the insert key.
    async fn insert(&self, record: &JobRecord) -> Result<JobId, StoreError>;

    /// Point lookup by id.
    async fn find_by_id(&self, id: JobId) -> Result<Option<JobRecord>, StoreError>;

    /// Dedup lookup by content digest.
    async fn find_by_hash(&self, hash: &str) -> Result<Option<JobRecord>, StoreError>;

    /// Atomically find one claimable record and mark it claimed.
    ///
    /// A record is claimable iff it is not completed, not claimed, and
    /// either its `trigger_ids` field is present and empty, or the field is
    /// absent and `ready` is set. Returns the post-update record.
    async fn claim_one(&self, claimed_at: DateTime<Utc>)
        -> Result<Option<JobRecord>, StoreError>;

    /// Write a single field. A missing record is a silent no-op, matching
    /// the underlying update-by-filter semantics.
    async fn set(&self, id: JobId, field: JobField) -> Result<(), StoreError>;

    /// Atomically append ids to an edge array, creating the field if absent.
    async fn push(&self, id: JobId, field: EdgeField, ids: &[JobId]) -> Result<(), StoreError>;

    /// Atomically remove an id from an edge array. Returns the number of
    /// records modified (0 or 1).
    async fn pull(&self, id: JobId, field: EdgeField, member: JobId) -> Result<u64, StoreError>;
}
