//! demo.combine job implementation.

use jobmesh_core::{async_trait, ArgValue, JobHandler};
use serde_json::{Map, Value};

use crate::job_types;

/// Handler for `demo.combine` jobs.
///
/// Joins the `parts` sequence into one string with an optional `separator`
/// (default single space). String parts are taken verbatim; other values
/// are JSON-encoded. Upstream job references inside `parts` arrive already
/// expanded to their results.
#[derive(Debug, Default)]
pub struct CombineHandler;

#[async_trait]
impl JobHandler for CombineHandler {
    fn job_type(&self) -> &str {
        job_types::COMBINE
    }

    async fn run(&self, args: Map<String, Value>) -> anyhow::Result<ArgValue> {
        let parts = args
            .get("parts")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow::anyhow!("'parts' argument missing or not a sequence"))?;
        let separator = args
            .get("separator")
            .and_then(Value::as_str)
            .unwrap_or(" ");

        let rendered: Vec<String> = parts
            .iter()
            .map(|part| match part {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        Ok(rendered.join(separator).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn joins_parts_with_default_separator() {
        let result = CombineHandler
            .run(json!({"parts": ["a", "b", 3]}).as_object().unwrap().clone())
            .await
            .unwrap();
        assert_eq!(result, ArgValue::from("a b 3"));
    }

    #[tokio::test]
    async fn respects_custom_separator() {
        let result = CombineHandler
            .run(
                json!({"parts": ["x", "y"], "separator": "+"})
                    .as_object()
                    .unwrap()
                    .clone(),
            )
            .await
            .unwrap();
        assert_eq!(result, ArgValue::from("x+y"));
    }

    #[tokio::test]
    async fn missing_parts_is_an_error() {
        assert!(CombineHandler.run(Map::new()).await.is_err());
    }
}
