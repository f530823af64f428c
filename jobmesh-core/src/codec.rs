//! Reference codec: compression and expansion of job references.
//!
//! Arguments are built as an [`ArgValue`] tree, a JSON-like value that can
//! additionally hold live references to referenceable entities. Compression
//! turns every reference into a tagged, serializable mapping; expansion
//! reverses it, dispatching on the tag through the decoder registry held by
//! the [`Context`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Number, Value};

use jobmesh_store::{JobId, Store};

use crate::context::Context;
use crate::error::Error;

/// Key carrying the type tag inside a compressed reference mapping.
pub const REF_KEY: &str = "cls";

/// Tag under which job references travel on the wire: `{"cls": "Job", "id": …}`.
pub const JOB_TAG: &str = "Job";

/// Argument map passed to [`Job::new`](crate::Job::new).
pub type ArgMap = BTreeMap<String, ArgValue>;

/// A tagged stand-in for a referenceable entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub tag: String,
    /// Encoded fields; for jobs, just the id.
    pub fields: Map<String, Value>,
}

/// Types that can appear inside job arguments as a live reference.
pub trait Referenceable {
    fn reference(&self) -> Reference;
}

/// A JSON-like argument value that may hold live references.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<ArgValue>),
    Mapping(BTreeMap<String, ArgValue>),
    Ref(Reference),
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Into::into).collect()),
            Value::Object(entries) => Self::Mapping(
                entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Number(v.into())
    }
}

impl From<u64> for ArgValue {
    fn from(v: u64) -> Self {
        Self::Number(v.into())
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Number::from_f64(v).map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ArgValue>> for ArgValue {
    fn from(entries: BTreeMap<String, ArgValue>) -> Self {
        Self::Mapping(entries)
    }
}

/// Compress a value tree: references become tagged mappings, containers
/// recurse, scalars pass through unchanged.
pub fn compress(value: &ArgValue) -> Value {
    match value {
        ArgValue::Null => Value::Null,
        ArgValue::Bool(b) => Value::Bool(*b),
        ArgValue::Number(n) => Value::Number(n.clone()),
        ArgValue::String(s) => Value::String(s.clone()),
        ArgValue::Sequence(items) => Value::Array(items.iter().map(compress).collect()),
        ArgValue::Mapping(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), compress(v)))
                .collect(),
        ),
        ArgValue::Ref(reference) => {
            let mut tagged = Map::new();
            tagged.insert(REF_KEY.to_owned(), Value::String(reference.tag.clone()));
            tagged.extend(reference.fields.clone());
            Value::Object(tagged)
        }
    }
}

/// Compress a whole argument map, preserving keys.
pub fn compress_args(args: &ArgMap) -> Map<String, Value> {
    args.iter().map(|(k, v)| (k.clone(), compress(v))).collect()
}

/// Decoder for one reference tag.
#[async_trait]
pub trait RefDecoder: Send + Sync {
    /// The tag this decoder handles.
    fn tag(&self) -> &str;

    /// Expand the encoded fields back into a value.
    async fn expand(&self, ctx: &Context, fields: &Map<String, Value>) -> Result<Value, Error>;
}

/// Decoder for job references.
///
/// A completed job expands to its stored result, itself recursively
/// expanded. An incomplete job expands to its raw record as a
/// partial-progress value instead of blocking.
pub struct JobRefDecoder;

#[async_trait]
impl RefDecoder for JobRefDecoder {
    fn tag(&self) -> &str {
        JOB_TAG
    }

    async fn expand(&self, ctx: &Context, fields: &Map<String, Value>) -> Result<Value, Error> {
        let id = reference_id(fields)?;
        let record = ctx
            .store()
            .find_by_id(id)
            .await?
            .ok_or(Error::NotFound(id))?;

        if record.completed {
            let result = record.result.unwrap_or(Value::Null);
            expand(ctx, &result).await
        } else {
            Ok(serde_json::to_value(&record)?)
        }
    }
}

/// Pull the job id out of a compressed reference's fields.
pub(crate) fn reference_id(fields: &Map<String, Value>) -> Result<JobId, Error> {
    let raw = fields
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default();
    JobId::parse(raw).map_err(|_| Error::InvalidId(raw.to_owned()))
}

/// Expand a compressed value tree.
///
/// Tagged mappings dispatch to the decoder registered for their tag;
/// mappings with an unknown tag pass through as plain data. Containers
/// recurse element-wise, scalars pass through unchanged.
pub fn expand<'a>(ctx: &'a Context, value: &'a Value) -> BoxFuture<'a, Result<Value, Error>> {
    Box::pin(async move {
        match value {
            Value::Object(entries) => {
                if let Some(tag) = entries.get(REF_KEY).and_then(Value::as_str) {
                    if let Some(decoder) = ctx.decoder(tag) {
                        return decoder.expand(ctx, entries).await;
                    }
                }
                let mut expanded = Map::new();
                for (k, v) in entries {
                    expanded.insert(k.clone(), expand(ctx, v).await?);
                }
                Ok(Value::Object(expanded))
            }
            Value::Array(items) => {
                let mut expanded = Vec::with_capacity(items.len());
                for item in items {
                    expanded.push(expand(ctx, item).await?);
                }
                Ok(Value::Array(expanded))
            }
            scalar => Ok(scalar.clone()),
        }
    })
}

/// Whether a compressed mapping is a job reference.
pub(crate) fn is_job_reference(entries: &Map<String, Value>) -> bool {
    entries.get(REF_KEY).and_then(Value::as_str) == Some(JOB_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use jobmesh_store::{JobRecord, MemoryStore, Store};
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> (Arc<Context>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Context::builder(store.clone()).build(), store)
    }

    fn job_ref(id: JobId) -> ArgValue {
        ArgValue::Ref(Reference {
            tag: JOB_TAG.into(),
            fields: json!({"id": id.to_string()}).as_object().unwrap().clone(),
        })
    }

    #[test]
    fn compress_tags_references() {
        let id = JobId::new();
        let mut args = ArgMap::new();
        args.insert("dep".into(), job_ref(id));
        args.insert("n".into(), 3i64.into());

        let compressed = compress_args(&args);
        assert_eq!(
            Value::Object(compressed),
            json!({"dep": {"cls": "Job", "id": id.to_string()}, "n": 3})
        );
    }

    #[tokio::test]
    async fn plain_values_round_trip() {
        let (ctx, _) = ctx();
        let original = ArgValue::from(json!({
            "s": "text",
            "n": 2.5,
            "b": true,
            "nested": {"seq": [1, 2, [3, null]]},
        }));
        let compressed = compress(&original);
        let expanded = expand(&ctx, &compressed).await.unwrap();
        assert_eq!(expanded, compressed);
    }

    #[tokio::test]
    async fn completed_reference_expands_to_result() {
        let (ctx, store) = ctx();
        let mut record = JobRecord::new("demo.seed", Map::new(), "h".into());
        record.completed = true;
        record.result = Some(json!("seeded"));
        store.insert(&record).await.unwrap();

        let compressed = compress(&job_ref(record.id));
        let expanded = expand(&ctx, &compressed).await.unwrap();
        assert_eq!(expanded, json!("seeded"));
    }

    #[tokio::test]
    async fn completed_reference_result_is_recursively_expanded() {
        let (ctx, store) = ctx();
        let mut inner = JobRecord::new("demo.seed", Map::new(), "h1".into());
        inner.completed = true;
        inner.result = Some(json!(41));
        store.insert(&inner).await.unwrap();

        let mut outer = JobRecord::new("demo.combine", Map::new(), "h2".into());
        outer.completed = true;
        outer.result = Some(compress(&job_ref(inner.id)));
        store.insert(&outer).await.unwrap();

        let expanded = expand(&ctx, &compress(&job_ref(outer.id))).await.unwrap();
        assert_eq!(expanded, json!(41));
    }

    #[tokio::test]
    async fn incomplete_reference_expands_to_raw_record() {
        let (ctx, store) = ctx();
        let record = JobRecord::new("demo.seed", Map::new(), "h".into());
        store.insert(&record).await.unwrap();

        let expanded = expand(&ctx, &compress(&job_ref(record.id))).await.unwrap();
        let obj = expanded.as_object().unwrap();
        assert_eq!(obj.get("_id"), Some(&json!(record.id.to_string())));
        assert_eq!(obj.get("completed"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn dangling_reference_is_an_error() {
        let (ctx, _) = ctx();
        let err = expand(&ctx, &compress(&job_ref(JobId::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_tag_passes_through_as_plain_mapping() {
        let (ctx, _) = ctx();
        let value = json!({"cls": "Dataset", "uri": "s3://bucket/key"});
        let expanded = expand(&ctx, &value).await.unwrap();
        assert_eq!(expanded, value);
    }
}
