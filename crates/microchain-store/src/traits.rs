//! Store trait: the abstract interface for ledger persistence.
//!
//! The ledger only needs a table-partitioned key-value store. Records are
//! written as canonical CBOR through [`StoreExt`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

use microchain_core::canonical::{from_canonical_cbor, to_canonical_cbor};

use crate::error::Result;

/// Logical tables of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Microblock hash -> where the microblock sits and its header.
    MicroblockInformation,
    /// Microblock hash -> encoded body.
    MicroblockContent,
    /// Virtual blockchain id -> height, last hash and local state.
    VirtualBlockchainState,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::MicroblockInformation => "microblock_information",
            Self::MicroblockContent => "microblock_content",
            Self::VirtualBlockchainState => "virtual_blockchain_state",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One write of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEntry {
    pub table: Table,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// The Store trait: async key-value interface.
///
/// Writing a key that exists replaces its value.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get the value stored under `key`.
    async fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`.
    async fn put(&self, table: Table, key: &[u8], value: &[u8]) -> Result<()>;

    /// Apply several writes so that either all or none become visible.
    async fn put_batch(&self, entries: Vec<WriteEntry>) -> Result<()>;
}

/// Typed records on top of [`Store`].
pub trait StoreExt: Store {
    /// Read and decode a record.
    fn get_record<T>(
        &self,
        table: Table,
        key: &[u8],
    ) -> impl std::future::Future<Output = Result<Option<T>>> + Send
    where
        T: DeserializeOwned;

    /// Encode and write a record.
    fn put_record<T>(
        &self,
        table: Table,
        key: &[u8],
        record: &T,
    ) -> impl std::future::Future<Output = Result<()>> + Send
    where
        T: Serialize + Sync;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn get_record<T>(&self, table: Table, key: &[u8]) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.get(table, key).await? {
            Some(bytes) => Ok(Some(from_canonical_cbor(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put_record<T>(&self, table: Table, key: &[u8], record: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let bytes = to_canonical_cbor(record)?;
        self.put(table, key, &bytes).await
    }
}

/// Encode a record into a batch entry.
pub fn record_entry<T: Serialize>(table: Table, key: &[u8], record: &T) -> Result<WriteEntry> {
    Ok(WriteEntry {
        table,
        key: key.to_vec(),
        value: to_canonical_cbor(record)?,
    })
}
