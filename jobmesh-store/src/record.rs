//! The persistent job record and its identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Identifier of a job record.
///
/// Generated at construction time and persisted verbatim at insert; the
/// string form is what ends up inside tagged argument references and edge
/// arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id from its string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One document per job instance.
///
/// `trigger_ids` and `then` are genuinely optional fields, not empty
/// defaults: the readiness predicate distinguishes a record that never had
/// dependencies from one whose dependencies have all drained, so absent
/// fields must stay absent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "_id")]
    pub id: JobId,
    /// Job type name, dispatched against the handler registry on reload.
    #[serde(rename = "type")]
    pub job_type: String,
    /// Creation time.
    pub when: DateTime<Utc>,
    /// Arguments with job references stored in tagged form.
    pub args: Map<String, Value>,
    /// Hex digest of (type name, compressed args); dedup key.
    pub hash: String,
    /// Exclusivity marker; `None` = unclaimed. Set exactly once, atomically,
    /// by [`Store::claim_one`](crate::Store::claim_one).
    pub claimed: Option<DateTime<Utc>>,
    /// True once `run` has returned successfully. Monotone.
    pub completed: bool,
    /// Explicit readiness flag set by `queue()`.
    pub ready: bool,
    /// Outstanding dependency ids not yet resolved. Only ever shrinks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_ids: Option<Vec<JobId>>,
    /// Ids of dependent jobs to notify on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<Vec<JobId>>,
    /// Compressed result, present once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message if `run` raised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl JobRecord {
    /// Create a fresh, unclaimed, not-ready record.
    pub fn new(job_type: impl Into<String>, args: Map<String, Value>, hash: String) -> Self {
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            when: Utc::now(),
            args,
            hash,
            claimed: None,
            completed: false,
            ready: false,
            trigger_ids: None,
            then: None,
            result: None,
            exception: None,
        }
    }

    /// Whether the record satisfies the claim predicate, ignoring `claimed`.
    ///
    /// When `trigger_ids` is present only its emptiness matters; `ready`
    /// decides only when the field is absent. A record with outstanding
    /// triggers is never claimable regardless of `ready`.
    pub fn is_runnable(&self) -> bool {
        !self.completed
            && match &self.trigger_ids {
                Some(triggers) => triggers.is_empty(),
                None => self.ready,
            }
    }
}
