//! In-memory store implementation.
//!
//! Single-process stand-in for the document store, used by tests and by
//! embedded deployments where workers run inside one process anyway. All
//! operations take the state lock, which is what makes `claim_one` atomic.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::record::{JobId, JobRecord};
use crate::store::{EdgeField, JobField, Store};

/// Internal storage optimized for both insertion-order scans and lookup by id.
#[derive(Debug, Default)]
struct MemoryState {
    /// Insertion order of record ids (oldest first); the claim scan follows it.
    order: VecDeque<JobId>,
    /// Map from id to record for O(1) lookup.
    records: HashMap<JobId, JobRecord>,
}

/// A [`Store`] kept entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, record: &JobRecord) -> Result<JobId, StoreError> {
        let mut state = self.state.write().await;
        state.order.push_back(record.id);
        state.records.insert(record.id, record.clone());
        Ok(record.id)
    }

    async fn find_by_id(&self, id: JobId) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.state.read().await.records.get(&id).cloned())
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<JobRecord>, StoreError> {
        let state = self.state.read().await;
        // oldest matching record wins, like a natural-order find_one
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .find(|r| r.hash == hash)
            .cloned())
    }

    async fn claim_one(
        &self,
        claimed_at: DateTime<Utc>,
    ) -> Result<Option<JobRecord>, StoreError> {
        let mut state = self.state.write().await;
        let claimable = state
            .order
            .iter()
            .find(|id| {
                state
                    .records
                    .get(id)
                    .is_some_and(|r| r.claimed.is_none() && r.is_runnable())
            })
            .copied();

        Ok(claimable.and_then(|id| {
            let record = state.records.get_mut(&id)?;
            record.claimed = Some(claimed_at);
            Some(record.clone())
        }))
    }

    async fn set(&self, id: JobId, field: JobField) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(record) = state.records.get_mut(&id) {
            match field {
                JobField::Ready(v) => record.ready = v,
                JobField::Completed(v) => record.completed = v,
                JobField::Result(v) => record.result = Some(v),
                JobField::Exception(v) => record.exception = Some(v),
            }
        }
        Ok(())
    }

    async fn push(&self, id: JobId, field: EdgeField, ids: &[JobId]) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(record) = state.records.get_mut(&id) {
            let target = match field {
                EdgeField::TriggerIds => &mut record.trigger_ids,
                EdgeField::Then => &mut record.then,
            };
            target.get_or_insert_with(Vec::new).extend_from_slice(ids);
        }
        Ok(())
    }

    async fn pull(
        &self,
        id: JobId,
        field: EdgeField,
        member: JobId,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let Some(record) = state.records.get_mut(&id) else {
            return Ok(0);
        };
        let target = match field {
            EdgeField::TriggerIds => &mut record.trigger_ids,
            EdgeField::Then => &mut record.then,
        };
        match target {
            Some(members) => {
                let before = members.len();
                members.retain(|m| *m != member);
                Ok(u64::from(members.len() != before))
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn record(job_type: &str, hash: &str) -> JobRecord {
        JobRecord::new(job_type, Map::new(), hash.into())
    }

    #[tokio::test]
    async fn insert_and_lookup() {
        let store = MemoryStore::new();
        let r = record("demo.seed", "h1");
        let id = store.insert(&r).await.unwrap();
        assert_eq!(id, r.id);
        assert_eq!(store.find_by_id(id).await.unwrap().unwrap().hash, "h1");
        assert_eq!(store.find_by_hash("h1").await.unwrap().unwrap().id, id);
        assert!(store.find_by_hash("h2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_requires_readiness() {
        let store = MemoryStore::new();
        let r = record("demo.seed", "h1");
        store.insert(&r).await.unwrap();

        // fresh record: no trigger_ids, ready=false -> not claimable
        assert!(store.claim_one(Utc::now()).await.unwrap().is_none());

        store.set(r.id, JobField::Ready(true)).await.unwrap();
        let claimed = store.claim_one(Utc::now()).await.unwrap().unwrap();
        assert_eq!(claimed.id, r.id);
        assert!(claimed.claimed.is_some());

        // already claimed -> gone from the queue
        assert!(store.claim_one(Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn outstanding_triggers_veto_ready_flag() {
        let store = MemoryStore::new();
        let mut r = record("demo.combine", "h1");
        r.ready = true;
        r.trigger_ids = Some(vec![JobId::new()]);
        store.insert(&r).await.unwrap();

        assert!(store.claim_one(Utc::now()).await.unwrap().is_none());

        // drain the trigger and the record becomes claimable without ready
        let dep = r.trigger_ids.as_ref().unwrap()[0];
        store.set(r.id, JobField::Ready(false)).await.unwrap();
        assert_eq!(store.pull(r.id, EdgeField::TriggerIds, dep).await.unwrap(), 1);
        let claimed = store.claim_one(Utc::now()).await.unwrap().unwrap();
        assert_eq!(claimed.id, r.id);
    }

    #[tokio::test]
    async fn claim_is_exclusive_under_contention() {
        let store = MemoryStore::new();
        let mut r = record("demo.seed", "h1");
        r.ready = true;
        store.insert(&r).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.claim_one(Utc::now()).await.unwrap().is_some()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn claim_scans_in_insertion_order() {
        let store = MemoryStore::new();
        let mut first = record("demo.seed", "h1");
        first.ready = true;
        let mut second = record("demo.seed", "h2");
        second.ready = true;
        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        let claimed = store.claim_one(Utc::now()).await.unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
    }

    #[tokio::test]
    async fn push_initializes_and_appends() {
        let store = MemoryStore::new();
        let r = record("demo.combine", "h1");
        store.insert(&r).await.unwrap();

        let a = JobId::new();
        let b = JobId::new();
        store.push(r.id, EdgeField::Then, &[a]).await.unwrap();
        store.push(r.id, EdgeField::Then, &[b]).await.unwrap();

        let stored = store.find_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(stored.then, Some(vec![a, b]));
    }

    #[tokio::test]
    async fn pull_reports_modification() {
        let store = MemoryStore::new();
        let mut r = record("demo.combine", "h1");
        let dep = JobId::new();
        r.trigger_ids = Some(vec![dep]);
        store.insert(&r).await.unwrap();

        assert_eq!(store.pull(r.id, EdgeField::TriggerIds, dep).await.unwrap(), 1);
        // second pull finds nothing to remove
        assert_eq!(store.pull(r.id, EdgeField::TriggerIds, dep).await.unwrap(), 0);
        let stored = store.find_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(stored.trigger_ids, Some(vec![]));
    }
}
