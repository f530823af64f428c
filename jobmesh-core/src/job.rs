//! The job entity: an in-process handle over a persistent job record.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use jobmesh_store::{EdgeField, JobField, JobId, JobRecord, Store};

use crate::codec::{self, ArgMap, ArgValue, Reference, Referenceable, JOB_TAG};
use crate::context::Context;
use crate::error::Error;

/// Outcome of the invocation contract [`Job::call`].
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Synchronous execution: the stored result, or `None` when `run`
    /// failed and the failure was recorded.
    Result(Option<Value>),
    /// Non-blocking status projection.
    Status { done: bool, result: Option<Value> },
}

/// Handle wrapping one persistent job record.
///
/// Construction persists the record (or binds to an existing one via the
/// dedup digest); every mutation writes the touched field straight through
/// to the store.
pub struct Job {
    ctx: Arc<Context>,
    record: JobRecord,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.record.id)
            .field("type", &self.record.job_type)
            .finish()
    }
}

impl Referenceable for Job {
    fn reference(&self) -> Reference {
        let mut fields = Map::new();
        fields.insert("id".to_owned(), Value::String(self.record.id.to_string()));
        Reference {
            tag: JOB_TAG.to_owned(),
            fields,
        }
    }
}

impl From<&Job> for ArgValue {
    fn from(job: &Job) -> Self {
        ArgValue::Ref(job.reference())
    }
}

impl Job {
    /// Construct by arguments: compress, digest, dedup, insert, wire edges.
    ///
    /// Unless `force` is set, a prior submission with the same digest is
    /// reused verbatim and no side effects occur. A fresh record starts
    /// unclaimed, not ready and incomplete; every incomplete job referenced
    /// anywhere in the argument tree gets a bidirectional dependency edge.
    pub async fn new(
        ctx: &Arc<Context>,
        job_type: &str,
        args: ArgMap,
        force: bool,
    ) -> Result<Self, Error> {
        let compressed = codec::compress_args(&args);
        let hash = crate::hash::dedup_hash(job_type, &compressed)?;

        if !force {
            if let Some(existing) = ctx.store().find_by_hash(&hash).await? {
                debug!(job_type, id = %existing.id, "reusing existing submission");
                return Ok(Self::wrap(ctx.clone(), existing));
            }
        }

        let record = JobRecord::new(job_type, compressed, hash);
        ctx.store().insert(&record).await?;
        let mut job = Self::wrap(ctx.clone(), record);

        let deps = extract_dependencies(ctx, &job.record.args).await?;
        if !deps.is_empty() {
            let ids: Vec<JobId> = deps.iter().map(Job::id).collect();
            job.push(EdgeField::TriggerIds, &ids).await?;
            for mut dep in deps {
                dep.push(EdgeField::Then, &[job.id()]).await?;
            }
        }

        Ok(job)
    }

    /// Construct by identifier.
    pub async fn load(ctx: &Arc<Context>, id: JobId) -> Result<Self, Error> {
        let record = ctx
            .store()
            .find_by_id(id)
            .await?
            .ok_or(Error::NotFound(id))?;
        Ok(Self::wrap(ctx.clone(), record))
    }

    /// Construct by identifier given in string form.
    pub async fn load_str(ctx: &Arc<Context>, raw: &str) -> Result<Self, Error> {
        let id = JobId::parse(raw).map_err(|_| Error::InvalidId(raw.to_owned()))?;
        Self::load(ctx, id).await
    }

    /// Bind directly to an already-fetched record.
    pub fn wrap(ctx: Arc<Context>, record: JobRecord) -> Self {
        Self { ctx, record }
    }

    pub fn id(&self) -> JobId {
        self.record.id
    }

    pub fn job_type(&self) -> &str {
        &self.record.job_type
    }

    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    /// Typed accessor into the stored argument bag.
    pub fn arg(&self, attribute: &str) -> Result<&Value, Error> {
        self.record
            .args
            .get(attribute)
            .ok_or_else(|| Error::MissingAttribute {
                job_type: self.record.job_type.clone(),
                attribute: attribute.to_owned(),
            })
    }

    /// Write a single field, in memory and through to the store.
    async fn set_field(&mut self, field: JobField) -> Result<(), Error> {
        match &field {
            JobField::Ready(v) => self.record.ready = *v,
            JobField::Completed(v) => self.record.completed = *v,
            JobField::Result(v) => self.record.result = Some(v.clone()),
            JobField::Exception(v) => self.record.exception = Some(v.clone()),
        }
        self.ctx.store().set(self.record.id, field).await?;
        Ok(())
    }

    /// Append ids to an edge array, in memory and via the store's atomic
    /// array append.
    pub async fn push(&mut self, field: EdgeField, ids: &[JobId]) -> Result<(), Error> {
        let target = match field {
            EdgeField::TriggerIds => &mut self.record.trigger_ids,
            EdgeField::Then => &mut self.record.then,
        };
        target.get_or_insert_with(Vec::new).extend_from_slice(ids);
        self.ctx.store().push(self.record.id, field, ids).await?;
        Ok(())
    }

    /// Establish an explicit ordering edge: `other` runs only after this
    /// job completes, independent of whether `other`'s arguments reference
    /// it. Returns `other` to support chaining.
    pub async fn then<'a>(&mut self, other: &'a mut Job) -> Result<&'a mut Job, Error> {
        info!(
            dependency = %self.record.job_type,
            dependent = %other.record.job_type,
            "defining ordering edge"
        );
        self.push(EdgeField::Then, &[other.id()]).await?;
        other.push(EdgeField::TriggerIds, &[self.id()]).await?;
        Ok(other)
    }

    /// Recursively queue every dependency discoverable from the argument
    /// tree, then mark this job ready if it is not already.
    ///
    /// Explicit queueing is the only path by which a job without a
    /// `trigger_ids` field becomes claimable.
    pub fn queue(&mut self) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            let deps = extract_dependencies(&self.ctx, &self.record.args).await?;
            for mut dep in deps {
                dep.queue().await?;
            }

            if !self.record.ready {
                info!(job_type = %self.record.job_type, id = %self.record.id, "queueing job");
                self.set_field(JobField::Ready(true)).await?;
            }

            Ok(())
        })
    }

    /// The execution contract invoked by a worker.
    ///
    /// Expands the stored arguments, dispatches to the registered handler
    /// and persists the outcome. Handler failures are recorded into
    /// `exception` and swallowed (`Ok(None)`): the record stays claimed and
    /// incomplete. Store errors propagate.
    pub async fn run_wrapper(&mut self) -> Result<Option<Value>, Error> {
        let mut expanded = Map::new();
        for (key, value) in &self.record.args {
            expanded.insert(key.clone(), codec::expand(&self.ctx, value).await?);
        }

        let handler = self
            .ctx
            .handler(&self.record.job_type)
            .ok_or_else(|| Error::UnknownType(self.record.job_type.clone()))?;

        let result = match handler.run(expanded).await {
            Ok(value) => value,
            Err(err) => {
                error!(
                    job_type = %self.record.job_type,
                    id = %self.record.id,
                    "job failed: {err:#}"
                );
                self.set_field(JobField::Exception(err.to_string())).await?;
                return Ok(None);
            }
        };

        info!(job_type = %self.record.job_type, id = %self.record.id, "job completed");

        // the result must be visible before the completed flag flips
        let stored = codec::compress(&result);
        self.set_field(JobField::Result(stored.clone())).await?;
        self.set_field(JobField::Completed(true)).await?;

        // dependents may have attached since this record was read
        let dependents = self
            .ctx
            .store()
            .find_by_id(self.record.id)
            .await?
            .and_then(|r| r.then)
            .unwrap_or_default();
        for dependent in dependents {
            let modified = self
                .ctx
                .store()
                .pull(dependent, EdgeField::TriggerIds, self.record.id)
                .await?;
            info!(dependent = %dependent, modified, "resolved dependency edge");
        }

        Ok(Some(stored))
    }

    /// Invocation contract.
    ///
    /// With `now`, returns the stored result when already completed and
    /// executes synchronously otherwise. Without `now`, ensures the job is
    /// queued and returns a status projection without blocking.
    pub async fn call(&mut self, now: bool) -> Result<CallOutcome, Error> {
        if now {
            if self.record.completed {
                return Ok(CallOutcome::Result(self.record.result.clone()));
            }
            let result = self.run_wrapper().await?;
            Ok(CallOutcome::Result(result))
        } else {
            if !self.record.completed {
                self.queue().await?;
            }
            Ok(CallOutcome::Status {
                done: self.record.completed,
                result: if self.record.completed {
                    self.record.result.clone()
                } else {
                    None
                },
            })
        }
    }
}

/// Collect every job reference in the tree, in deterministic traversal
/// order. Invalid ids inside stored references surface as errors.
fn collect_reference_ids(value: &Value, out: &mut Vec<JobId>) -> Result<(), Error> {
    match value {
        Value::Object(entries) => {
            if codec::is_job_reference(entries) {
                out.push(codec::reference_id(entries)?);
            } else {
                for child in entries.values() {
                    collect_reference_ids(child, out)?;
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_reference_ids(item, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Reload every job referenced anywhere in a compressed argument tree and
/// keep the ones that have not completed.
///
/// A completed reference expands to its result rather than a job, so it
/// contributes no dependency edge.
pub async fn extract_dependencies(
    ctx: &Arc<Context>,
    args: &Map<String, Value>,
) -> Result<Vec<Job>, Error> {
    let mut ids = Vec::new();
    for value in args.values() {
        collect_reference_ids(value, &mut ids)?;
    }

    let mut deps = Vec::new();
    for id in ids {
        let job = Job::load(ctx, id).await?;
        if !job.record().completed {
            deps.push(job);
        }
    }
    Ok(deps)
}
