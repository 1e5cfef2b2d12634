//! The explicit context every session runs in.

use super::session::Session;
use crate::config::Config;
use crate::error::Result;
use crate::schema::Schema;
use crate::store::{MemoryStorage, Storage};
use std::sync::Arc;

/// Context owns the schema, the storage handle and the configuration.
///
/// Cloning is cheap; clones share everything.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    schema: Schema,
    storage: Arc<dyn Storage>,
    config: Config,
}

impl Context {
    /// Creates a context after checking `schema`.
    pub fn new(schema: Schema, storage: Arc<dyn Storage>, config: Config) -> Result<Self> {
        schema.check()?;
        tracing::debug!(
            entities = schema.entities.len(),
            types = schema.types.len(),
            merge_mode = %config.merge_mode,
            "Created context"
        );
        Ok(Context {
            inner: Arc::new(Inner {
                schema,
                storage,
                config,
            }),
        })
    }

    /// A context over fresh in-memory storage with the default configuration.
    pub fn in_memory(schema: Schema) -> Result<Self> {
        Context::new(schema, Arc::new(MemoryStorage::new()), Config::default())
    }

    /// Opens a session with an empty identity map.
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Releases this handle. Storage goes away with the last handle sharing it.
    pub fn close(self) {
        tracing::debug!(
            handles = Arc::strong_count(&self.inner),
            "Closing context"
        );
    }
}
