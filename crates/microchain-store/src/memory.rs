//! In-memory implementation of the Store trait.
//!
//! Used by tests and by embedders that keep the ledger in memory. All data
//! is lost when the store is dropped. Thread-safe via RwLock.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::trace;

use crate::error::{Result, StoreError};
use crate::traits::{Store, Table, WriteEntry};

/// In-memory store implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<(Table, Vec<u8>), Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in `table`.
    pub fn count(&self, table: Table) -> Result<usize> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.keys().filter(|(t, _)| *t == table).count())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.get(&(table, key.to_vec())).cloned())
    }

    async fn put(&self, table: Table, key: &[u8], value: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        trace!(%table, key_len = key.len(), value_len = value.len(), "put");
        inner.insert((table, key.to_vec()), value.to_vec());
        Ok(())
    }

    async fn put_batch(&self, entries: Vec<WriteEntry>) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        trace!(entries = entries.len(), "put batch");
        for entry in entries {
            inner.insert((entry.table, entry.key), entry.value);
        }
        Ok(())
    }
}
