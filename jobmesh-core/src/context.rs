//! Process configuration: store handle, handler registry, reference decoders.
//!
//! Built once at startup and passed by `Arc` into the job entity, the
//! worker and the codec. Nothing in the engine reaches for an ambient
//! global.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use jobmesh_store::Store;

use crate::codec::{JobRefDecoder, RefDecoder};
use crate::handler::JobHandler;

/// Shared engine context.
pub struct Context {
    store: Arc<dyn Store>,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    decoders: HashMap<String, Arc<dyn RefDecoder>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("decoders", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Context {
    /// Start building a context over the given store.
    pub fn builder(store: Arc<dyn Store>) -> ContextBuilder {
        ContextBuilder {
            store,
            handlers: HashMap::new(),
            decoders: HashMap::new(),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Handler registered for a job type name, if any.
    pub fn handler(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    /// Decoder registered for a reference tag, if any.
    pub fn decoder(&self, tag: &str) -> Option<Arc<dyn RefDecoder>> {
        self.decoders.get(tag).cloned()
    }

    /// Registered job type names.
    pub fn job_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// Builder populating the registries once, before workers start.
pub struct ContextBuilder {
    store: Arc<dyn Store>,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    decoders: HashMap<String, Arc<dyn RefDecoder>>,
}

impl ContextBuilder {
    /// Register a job handler under its type name. The last registration
    /// for a name wins.
    pub fn register<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers
            .insert(handler.job_type().to_owned(), Arc::new(handler));
        self
    }

    /// Register an additional reference decoder.
    pub fn decoder<D: RefDecoder + 'static>(mut self, decoder: D) -> Self {
        self.decoders.insert(decoder.tag().to_owned(), Arc::new(decoder));
        self
    }

    pub fn build(mut self) -> Arc<Context> {
        // the job decoder is always present; explicit registrations may
        // override it
        let job_decoder = JobRefDecoder;
        self.decoders
            .entry(job_decoder.tag().to_owned())
            .or_insert_with(|| Arc::new(job_decoder));

        Arc::new(Context {
            store: self.store,
            handlers: self.handlers,
            decoders: self.decoders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JOB_TAG;
    use jobmesh_store::MemoryStore;

    #[test]
    fn job_decoder_is_registered_by_default() {
        let ctx = Context::builder(Arc::new(MemoryStore::new())).build();
        assert!(ctx.decoder(JOB_TAG).is_some());
        assert!(ctx.decoder("Dataset").is_none());
    }
}
