//! Process bootstrap: logging and store selection.

use std::sync::Arc;

use anyhow::Context as _;
use jobmesh_config::{LoggingConfig, StoreConfig};
use jobmesh_store::{MemoryStore, MongoConfig, MongoStore, Store};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level; the JSON formatter is opt-in
/// via config.
pub fn init_tracing(cfg: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the configured store backend.
pub async fn build_store(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn Store>> {
    match cfg.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "mongodb" => {
            let store = MongoStore::connect(&MongoConfig {
                uri: cfg.uri.clone(),
                database: cfg.database.clone(),
                collection: cfg.collection.clone(),
            })
            .await
            .context("connecting to mongodb")?;
            store
                .setup_collection()
                .await
                .context("creating job collection indexes")?;
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("unknown store backend '{other}'"),
    }
}
