use std::fmt;

use surrealdb::engine::any::{self, Any};
use surrealdb::Surreal;

use crate::error::StoreResult;

/// A connected SurrealDB handle, namespaced and selected to Bouncer's
/// database. Mirrors `astrid-storage::Database`'s embedded-engine wrapper.
#[derive(Clone)]
pub struct Database {
    inner: Surreal<Any>,
}

impl Database {
    /// Connect to an on-disk embedded SurrealKV store at `path`.
    pub async fn connect_embedded(path: &str) -> StoreResult<Self> {
        let inner = any::connect(format!("surrealkv://{path}")).await?;
        inner.use_ns("bouncer").use_db("main").await?;
        Ok(Self { inner })
    }

    /// Connect to an in-memory store (tests, ephemeral deployments).
    pub async fn connect_memory() -> StoreResult<Self> {
        let inner = any::connect("mem://").await?;
        inner.use_ns("bouncer").use_db("main").await?;
        Ok(Self { inner })
    }

    /// The underlying typed client, for row-store modules to query against.
    pub(crate) fn client(&self) -> &Surreal<Any> {
        &self.inner
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
