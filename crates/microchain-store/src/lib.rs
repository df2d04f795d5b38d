//! # Microchain Store
//!
//! Storage abstraction for microchain ledgers: a table-partitioned,
//! async key-value [`Store`] and its in-memory implementation.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`StoreExt`] - Typed, canonically encoded records on top of a store
//! - [`MemoryStore`] - In-memory storage
//! - [`Table`] - Logical tables used by the ledger

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{record_entry, Store, StoreExt, Table, WriteEntry};
