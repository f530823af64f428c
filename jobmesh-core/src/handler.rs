//! The behavior contract for a job type.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::codec::ArgValue;
use crate::error::Error;

/// Trait supplying the behavior for one job type.
///
/// Handlers are registered once at process start into the
/// [`Context`](crate::Context) registry keyed by [`job_type`](Self::job_type);
/// the worker dispatches stored records against that registry. `run`
/// receives the stored arguments fully expanded: references to completed
/// jobs arrive as their results, references to incomplete jobs as their raw
/// records.
///
/// `run` may be invoked at most once per record under normal operation;
/// that guarantee comes from the claim exclusivity, not from `run` itself.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The type name this handler executes.
    fn job_type(&self) -> &str;

    /// Execute the job with the expanded arguments.
    ///
    /// The returned value may itself contain references, which are
    /// compressed before storage.
    async fn run(&self, args: Map<String, Value>) -> anyhow::Result<ArgValue> {
        let _ = args;
        Err(Error::Unimplemented(self.job_type().to_owned()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    #[async_trait]
    impl JobHandler for Bare {
        fn job_type(&self) -> &str {
            "demo.bare"
        }
    }

    #[tokio::test]
    async fn default_run_is_unimplemented() {
        let err = Bare.run(Map::new()).await.unwrap_err();
        let err = err.downcast::<Error>().unwrap();
        assert!(matches!(err, Error::Unimplemented(t) if t == "demo.bare"));
    }
}
