//! # Microchain
//!
//! A ledger substrate made of virtual blockchains: independent chains of
//! microblocks, one per account, organization, application or application
//! ledger, each folding into a typed local state.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use microchain::{Ledger, LedgerConfig};
//! use microchain::store::MemoryStore;
//!
//! let ledger = Ledger::new(MemoryStore::new(), LedgerConfig::default());
//! let result = ledger.submit_microblock(&bytes, now).await?;
//! let state = ledger.virtual_blockchain_state(&result.virtual_blockchain_id).await?;
//! ```
//!
//! ## Submission pipeline
//!
//! 1. Decode the envelope, checking magic string, section schemas and body hash.
//! 2. Link: a genesis starts a new chain whose id is its hash; any other
//!    microblock must extend the current head of a known chain.
//! 3. Check the section grammar of the chain type.
//! 4. Check the timestamp window against the submission time.
//! 5. Fold the microblock into the chain's local state.
//! 6. Persist microblock information, content and the new head in one batch.
//!
//! ## Crate Organization
//!
//! - [`core`] - Hashes, keys, canonical codec, microblocks, structure checking
//! - [`state`] - Local states and their updaters
//! - [`store`] - Storage abstraction

pub mod config;
pub mod error;
pub mod ledger;
pub mod records;

pub use config::{LedgerConfig, LocalStateVersion};
pub use error::{LedgerError, Result};
pub use ledger::{Ledger, SubmitResult};
pub use records::{MicroblockInformation, VirtualBlockchainState};

// Re-export component crates
pub use microchain_core as core;
pub use microchain_state as state;
pub use microchain_store as store;
