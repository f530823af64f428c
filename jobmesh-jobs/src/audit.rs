//! demo.audit job implementation.

use jobmesh_core::{async_trait, ArgValue, JobHandler};
use serde_json::{Map, Value};
use tracing::info;

use crate::job_types;

/// Handler for `demo.audit` jobs.
///
/// Logs its expanded arguments and returns nothing. Handy as a fan-in
/// target: wire many jobs into one audit via `then()` and it runs once all
/// of them have completed.
#[derive(Debug, Default)]
pub struct AuditHandler;

#[async_trait]
impl JobHandler for AuditHandler {
    fn job_type(&self) -> &str {
        job_types::AUDIT
    }

    async fn run(&self, args: Map<String, Value>) -> anyhow::Result<ArgValue> {
        info!(
            keys = ?args.keys().collect::<Vec<_>>(),
            "audit checkpoint reached"
        );
        Ok(ArgValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn always_succeeds_with_null() {
        let result = AuditHandler
            .run(json!({"anything": [1, 2]}).as_object().unwrap().clone())
            .await
            .unwrap();
        assert_eq!(result, ArgValue::Null);
    }
}
