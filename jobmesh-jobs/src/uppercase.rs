//! demo.uppercase job implementation.

use jobmesh_core::{async_trait, ArgValue, JobHandler};
use serde_json::{Map, Value};

use crate::job_types;

/// Handler for `demo.uppercase` jobs.
///
/// Uppercases the `text` argument. When the argument arrived as the result
/// of an upstream job it is already a plain string here; anything else is
/// rejected rather than stringified, so a partially-resolved record fails
/// visibly instead of producing garbage.
#[derive(Debug, Default)]
pub struct UppercaseHandler;

#[async_trait]
impl JobHandler for UppercaseHandler {
    fn job_type(&self) -> &str {
        job_types::UPPERCASE
    }

    async fn run(&self, args: Map<String, Value>) -> anyhow::Result<ArgValue> {
        let text = args
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("'text' argument missing or not a string"))?;
        Ok(text.to_uppercase().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn uppercases_text() {
        let result = UppercaseHandler
            .run(json!({"text": "quiet"}).as_object().unwrap().clone())
            .await
            .unwrap();
        assert_eq!(result, ArgValue::from("QUIET"));
    }

    #[tokio::test]
    async fn non_string_argument_is_rejected() {
        let err = UppercaseHandler
            .run(json!({"text": 5}).as_object().unwrap().clone())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("text"));
    }
}
