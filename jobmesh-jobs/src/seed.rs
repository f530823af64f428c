//! demo.seed job implementation.

use jobmesh_core::{async_trait, ArgValue, JobHandler};
use serde_json::{Map, Value};
use tracing::info;

use crate::job_types;

/// Handler for `demo.seed` jobs.
///
/// Returns the optional `value` argument, or a fixed marker when none is
/// given. Useful as the root of a demo pipeline.
#[derive(Debug, Default)]
pub struct SeedHandler;

#[async_trait]
impl JobHandler for SeedHandler {
    fn job_type(&self) -> &str {
        job_types::SEED
    }

    async fn run(&self, args: Map<String, Value>) -> anyhow::Result<ArgValue> {
        let value = args
            .get("value")
            .cloned()
            .unwrap_or_else(|| Value::String("seed".to_owned()));
        info!(value = %value, "seeding");
        Ok(value.into())
    }
}
