//! Ledger error types.

use thiserror::Error;

use microchain_core::{Sha256Hash, TemporalValidity, VirtualBlockchainType};

/// Errors that can occur while submitting or reading microblocks.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("core error: {0}")]
    Core(#[from] microchain_core::CoreError),

    #[error("state error: {0}")]
    State(#[from] microchain_state::StateError),

    #[error("store error: {0}")]
    Store(#[from] microchain_store::StoreError),

    #[error("microblock {0} does not follow the structure of its type")]
    InvalidStructure(Sha256Hash),

    #[error("microblock timestamp {timestamp} rejected at {now}: {validity:?}")]
    InvalidTimestamp {
        timestamp: u64,
        now: u64,
        validity: TemporalValidity,
    },

    #[error("unsupported protocol version: expected {expected}, found {found}")]
    UnsupportedProtocolVersion { expected: u16, found: u16 },

    #[error("microblock {0} already exists")]
    AlreadyExists(Sha256Hash),

    #[error("previous microblock {0} is unknown")]
    UnknownPreviousMicroblock(Sha256Hash),

    #[error("virtual blockchain {0} is unknown")]
    UnknownVirtualBlockchain(Sha256Hash),

    #[error("invalid genesis microblock: {0}")]
    InvalidGenesis(String),

    #[error("chain type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: VirtualBlockchainType,
        found: VirtualBlockchainType,
    },

    #[error("invalid height: expected {expected}, found {found}")]
    InvalidHeight { expected: u64, found: u64 },

    #[error("microblock does not extend the chain head {expected}, extends {found}")]
    NotChainHead {
        expected: Sha256Hash,
        found: Sha256Hash,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// Whether the submitted microblock itself was at fault, as opposed to
    /// the store or the configuration.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, LedgerError::Store(_) | LedgerError::Config(_))
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
